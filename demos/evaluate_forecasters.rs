use chrono::NaiveDate;
use ts_trove::eval::eda::{
    describe_acf, describe_distribution, describe_rolling, describe_stationarity,
    describe_time_index,
};
use ts_trove::eval::report::{best_by, write_csv};
use ts_trove::eval::techniques::{
    ExponentialSmoothing, MovingAverageForecaster, NaiveLastValue, SeasonalNaive,
};
use ts_trove::eval::utils::train_test_split;
use ts_trove::eval::{Direction, TaskFamily};
use ts_trove::{AnyTechnique, DatasetSplit, Harness, HarnessConfig, MetricRegistry, Series};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("ts_trove: Evaluate Forecasters");
    println!("==============================\n");

    let series = create_weekly_seasonal_data()?;
    println!("Series: {} daily observations\n", series.len());

    // Explore the data first
    let index = describe_time_index(&series)?;
    let distribution = describe_distribution(&series)?;
    let acf = describe_acf(&series, 7)?;
    println!("Inferred step: {:?}, missing: {}", index.step, index.missing_count());
    println!(
        "Mean {:.2}, std {:.2}, median {:.2}",
        distribution.mean,
        distribution.std_dev.unwrap_or(f64::NAN),
        distribution.median
    );
    println!("ACF at lag 7: {:.3}", acf[7]);

    let rolling = describe_rolling(&series, 7)?;
    if let (Some(first), Some(last)) = (rolling.mean.values().first(), rolling.mean.values().last()) {
        println!("Weekly rolling mean: {:.2} -> {:.2}", first, last);
    }
    match describe_stationarity(&series, None) {
        Ok(adf) => println!(
            "ADF statistic {:.3} (5% critical {:.3}), p = {:.4}, stationary: {}\n",
            adf.adf_statistic, adf.critical_value_5pct, adf.p_value, adf.stationary
        ),
        Err(e) => println!("ADF test unavailable: {}\n", e),
    }

    let (train, test) = train_test_split(&series, 0.2)?;
    let split = DatasetSplit::forecasting("weekly-seasonal", train, test);

    let registry = MetricRegistry::with_defaults();
    let harness = Harness::new(HarnessConfig::default(), &registry)?;

    let techniques = vec![
        AnyTechnique::forecaster(NaiveLastValue::new()),
        AnyTechnique::forecaster(SeasonalNaive::new(7)?),
        AnyTechnique::forecaster(MovingAverageForecaster::new(7)?),
        AnyTechnique::forecaster(ExponentialSmoothing::optimized()),
    ];

    let mut reports = Vec::new();
    for technique in techniques {
        let report = harness.evaluate(technique, &split, None)?;
        println!("{}\n", report.to_key_value());
        reports.push(report);
    }

    let direction = registry
        .direction(TaskFamily::Forecasting, "mae")
        .unwrap_or(Direction::LowerIsBetter);
    if let Some(best) = best_by(&reports, "mae", direction) {
        println!("Best by MAE: {}", best.technique().name);
    }

    println!("\nCSV export:");
    write_csv(&reports, std::io::stdout())?;

    Ok(())
}

/// Ten weeks of a weekly pattern on a slow trend
fn create_weekly_seasonal_data() -> Result<Series, Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("invalid start date")?;
    let pattern = [10.0, 12.0, 13.0, 12.5, 11.0, 6.0, 5.0];
    let values = (0..70)
        .map(|i| pattern[i % 7] + i as f64 * 0.05)
        .collect();
    Ok(Series::daily(start, values)?.with_name("weekly-seasonal"))
}
