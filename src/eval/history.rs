use std::fs;

use coherence_lib::cpu::SimPolicy;
use coherence_lib::run_wrapper::{init_logger, run_comparison};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger(false);

    let param_tokens: Vec<String> = std::env::args().collect();
    let mut policy = SimPolicy { history: true, ..Default::default() };
    if let Some(raw) = param_tokens.get(1) {
        policy.instruction_count = raw.parse()?;
    }
    if let Some(raw) = param_tokens.get(2) {
        policy.seed = Some(raw.parse()?);
    }

    // One miss-rate series per protocol, over the same instructions
    let cpus = run_comparison(policy)?;

    // Plot the data
    use plotters::prelude::*;

    fs::create_dir_all("eval")?;
    let output_path = "eval/history_eval.svg";
    let plot_title = format!("Miss rate over {} instructions", policy.instruction_count);

    let y_max = cpus
        .iter()
        .flat_map(|cpu| cpu.miss_rate_history().iter().copied())
        .fold(0.0_f64, f64::max);

    let root = SVGBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(plot_title.as_str(), ("sans-serif", 40).into_font())
        .margin(5)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(1..policy.instruction_count, 0.0..(y_max * 1.1).max(0.1))?;
    ctx.configure_mesh()
        .x_desc("Instructions")
        .y_desc("Miss rate")
        .draw()?;

    for (i, cpu) in cpus.iter().enumerate() {
        let series = cpu
            .miss_rate_history()
            .iter()
            .enumerate()
            .map(|(n, rate)| (n + 1, *rate));
        let color = Palette99::pick(i).to_rgba();
        ctx.draw_series(LineSeries::new(series, color))?
            .label(cpu.protocol().to_string())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    ctx.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    eprintln!("Wrote {}", output_path);

    Ok(())
}
