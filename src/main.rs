// Plot fake quantization error and gradient saturation
use fake_quant::{backward, forward, Array, QuantParams};

use plotters::prelude::*;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fake_quant=info".into()),
        )
        .init();

    // As bit width increases
    let mse = mse_as_bits_increase(8)?;
    for (bits, err) in &mse {
        info!(bits, mse = err, "fake quantization error");
    }
    draw_line_chart(
        "mse-bits.png",
        "Fake Quantization MSE vs. Bit Width",
        "Bit Width",
        "Mean Squared Error (MSE)",
        &mse,
    )?;

    // As the calibration range is clipped
    let saturation = saturation_as_clip_narrows(20)?;
    for (clip, fraction) in &saturation {
        info!(clip, fraction, "saturated gradient fraction");
    }
    draw_line_chart(
        "saturation-clip.png",
        "Zeroed Gradients vs. Calibration Clip Ratio",
        "Clip Ratio (fraction of observed range)",
        "Fraction of Zeroed Gradients",
        &saturation,
    )?;

    Ok(())
}

fn draw_line_chart(
    path: &str,
    caption: &str,
    x_desc: &str,
    y_desc: &str,
    series: &[(f32, f32)],
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let (x_min, x_max) = (
        series.first().map(|(x, _)| *x).unwrap_or(0.0),
        series.last().map(|(x, _)| *x).unwrap_or(1.0),
    );
    let y_max = series.iter().map(|(_, y)| *y).fold(0.0, f32::max) * 1.1; // Add 10% padding
    let y_max = if y_max > 0.0 { y_max } else { 1.0 };

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 40).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(75)
        .build_cartesian_2d(x_min..x_max, 0f32..y_max)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .light_line_style(&WHITE.mix(0.8))
        .draw()?;

    chart.draw_series(LineSeries::new(series.iter().cloned(), &RED))?;

    chart.draw_series(
        series
            .iter()
            .map(|(x, y)| Circle::new((*x, *y), 3, RED.filled())),
    )?;

    root.present()?;
    info!(path, "wrote chart");

    Ok(())
}

fn mean_squared_error(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Number of values must be equal");
    let n = a.len() as f32;
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x - y).powi(2))
        .sum::<f32>()
        / n
}

fn mse_as_bits_increase(max_bits: u32) -> fake_quant::Result<Vec<(f32, f32)>> {
    assert!(max_bits >= 2);

    let mut mses = Vec::new();

    let iterations_per_width = 100;
    let shape = [32, 32];

    for bits in 2..=max_bits {
        let mut sum = 0.0;

        for _ in 0..iterations_per_width {
            let input = Array::random(&shape, -1f32..1f32);
            let (min, max) = input.min_and_max().unwrap_or((0.0, 0.0));
            let p = QuantParams::from_min_max(min, max, 0, (1 << bits) - 1)?;

            let output = forward(&input, p.scale, p.zero_point, p.quant_min, p.quant_max, 0, 0)?;

            sum += mean_squared_error(input.data(), output.data());
        }

        mses.push((bits as f32, sum / iterations_per_width as f32));
    }

    Ok(mses)
}

fn saturation_as_clip_narrows(steps: u32) -> fake_quant::Result<Vec<(f32, f32)>> {
    assert!(steps >= 1);

    let mut fractions = Vec::new();

    let iterations_per_clip = 50;
    let shape = [32, 32];

    for step in 1..=steps {
        let clip = step as f32 / steps as f32;
        let mut sum = 0.0;

        for _ in 0..iterations_per_clip {
            let input = Array::random(&shape, -1f32..1f32);
            let ones = Array::from_vec(vec![1.0; input.numel()]);
            let (min, max) = input.min_and_max().unwrap_or((0.0, 0.0));
            let p = QuantParams::from_min_max(min * clip, max * clip, 0, 255)?;

            let grad = backward(&ones, &input, p.scale, p.zero_point, p.quant_min, p.quant_max, 0, 0)?;

            let zeroed = grad.data().iter().filter(|&&g| g == 0.0).count();
            sum += zeroed as f32 / grad.numel() as f32;
        }

        fractions.push((clip, sum / iterations_per_clip as f32));
    }

    Ok(fractions)
}
