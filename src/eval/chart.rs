use std::fs;
use std::process;

use coherence_lib::error::ResultsError;
use coherence_lib::protocol::ProtocolKind;
use coherence_lib::report::{read_results, ResultsTable};
use plotters::coord::Shift;
use plotters::prelude::*;

const DEFAULT_RESULTS: &str = "eval/results.txt";
const OUTPUT_PATH: &str = "eval/chart_eval.svg";

fn main() {
    if let Err(e) = run_eval() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Bars of one chart: label and height
fn bars(
    table: &ResultsTable,
) -> Result<(Vec<(String, f64)>, Vec<(String, f64)>), ResultsError> {
    let mut miss_rates = Vec::new();
    let mut counts = Vec::new();
    for protocol in ProtocolKind::ALL {
        miss_rates.push((protocol.to_string(), table.miss_rate(protocol)? * 100.0));
        counts.push((format!("{} misses", protocol), table.cache_misses(protocol)?));
        counts.push((
            format!("{} total", protocol),
            table.total_instructions(protocol)?,
        ));
    }
    Ok((miss_rates, counts))
}

fn draw_bars(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    title: &str,
    y_desc: &str,
    data: &[(String, f64)],
) -> Result<(), Box<dyn std::error::Error>> {
    let y_max = data.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    let labels: Vec<&str> = data.iter().map(|(label, _)| label.as_str()).collect();

    let mut ctx = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (0u32..data.len() as u32).into_segmented(),
            0.0..(y_max * 1.1).max(1.0),
        )?;
    ctx.configure_mesh()
        .disable_x_mesh()
        .y_desc(y_desc)
        .x_label_formatter(&|x: &SegmentValue<u32>| match x {
            SegmentValue::CenterOf(i) => {
                labels.get(*i as usize).copied().unwrap_or("").to_string()
            }
            _ => String::new(),
        })
        .draw()?;

    for (i, (_, value)) in data.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        ctx.draw_series(
            Histogram::vertical(&ctx)
                .style(color.filled())
                .margin(20)
                .data([(i as u32, *value)]),
        )?;
    }
    Ok(())
}

fn run_eval() -> Result<(), Box<dyn std::error::Error>> {
    let param_tokens: Vec<String> = std::env::args().collect();
    let results_path = param_tokens
        .get(1)
        .map(String::as_str)
        .unwrap_or(DEFAULT_RESULTS);

    let table = read_results(results_path)?;
    let (miss_rates, counts) = bars(&table)?;

    fs::create_dir_all("eval")?;
    let root = SVGBackend::new(OUTPUT_PATH, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, 2));

    draw_bars(&panels[0], "Miss rate", "Miss rate (%)", &miss_rates)?;
    draw_bars(&panels[1], "Misses vs instructions", "Count", &counts)?;

    root.present()?;
    eprintln!("Wrote {}", OUTPUT_PATH);

    Ok(())
}
