use autoflight_core::frame::SkippedFile;
use autoflight_core::io::scan::GateReport;
use autoflight_core::pipeline::{DryRunReport, OrthomosaicResult};
use console::Style;

use crate::commands::format_bytes;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    warn: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            warn: Style::new().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!(
        "  {}",
        s.title
            .apply_to("\u{2550}".repeat(title.chars().count()))
    );
    println!();
}

pub fn print_run_summary(result: &OrthomosaicResult) {
    let s = Styles::new();
    let (width, height) = result.size();

    print_title(&s, "Orthomosaic");
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(result.output_path.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Images"),
        s.value.apply_to(result.image_count())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Size"),
        s.value.apply_to(format!("{width} x {height}"))
    );
    if result.mosaic.passthrough {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Stitching"),
            s.warn.apply_to("single image, no stitching needed")
        );
    }
    print_skipped(&s, &result.skipped);
    println!();
}

pub fn print_dry_run(report: &DryRunReport) {
    let s = Styles::new();

    print_title(&s, "Dry Run");
    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(report.input_dir.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(report.output_path.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Images"),
        s.value.apply_to(report.image_count)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Total size"),
        s.value.apply_to(format_bytes(report.total_bytes))
    );
    print_skipped(&s, &report.skipped);
    println!();
}

pub fn print_scan(gate: &GateReport) {
    let s = Styles::new();

    print_title(&s, "Input Scan");
    println!(
        "  {:<14}{}",
        s.label.apply_to("Directory"),
        s.path.apply_to(gate.base.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Found"),
        s.value.apply_to(gate.discovered)
    );
    println!();

    println!("  {}", s.header.apply_to("Candidates"));
    for candidate in &gate.candidates {
        println!(
            "    {:<40}{:<6}{}",
            candidate.file_name(),
            candidate.format.to_string(),
            s.label.apply_to(format_bytes(candidate.size_bytes))
        );
    }
    println!(
        "    {:<46}{}",
        s.label.apply_to("Total"),
        s.value.apply_to(format_bytes(gate.total_bytes()))
    );
    print_skipped(&s, &gate.skipped);
    println!();
}

fn print_skipped(s: &Styles, skipped: &[SkippedFile]) {
    if skipped.is_empty() {
        return;
    }
    println!();
    println!("  {}", s.header.apply_to("Skipped"));
    for file in skipped {
        let name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.path.display().to_string());
        println!("    {:<40}{}", name, s.warn.apply_to(&file.reason));
    }
}
