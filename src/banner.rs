//! Startup banner and run summary display.

use std::path::Path;

use crate::consts::{REPO, format_number};
use crate::engine::RunReport;

/// Run configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub text_model: &'a str,
    pub text_auth: &'a str,
    pub image_model: &'a str,
    pub image_auth: &'a str,
    pub cache: &'a str,
}

/// Print the startup banner with run info.
pub fn print_banner(info: &BannerInfo) {
    println!(
        r#"
   ╔═══════════════════════════════════════╗
   ║       E P U B   I L L U S T R A T O R ║
   ║      pictures for the words within    ║
   ╚═══════════════════════════════════════╝

   version   {}
   repo      {}
   input     {}
   output    {}
   text      gemini ({}) · {}
   images    stability ({}) · {}
   cache     {}
"#,
        env!("CARGO_PKG_VERSION"),
        REPO,
        info.input.display(),
        info.output.display(),
        info.text_model,
        info.text_auth,
        info.image_model,
        info.image_auth,
        info.cache,
    );
}

/// Print what the run did.
pub fn print_run_summary(report: &RunReport, output: &Path) {
    println!(
        "chapters: {} seen, {} skipped, {} failed, {} illustrated",
        report.chapters,
        report.chapters_skipped,
        report.chapters_failed,
        report.chapters_illustrated
    );
    println!(
        "images:   {} generated, {} from cache, {} failed",
        report.images_generated, report.images_cached, report.images_failed
    );
    let usage = report.usage;
    if usage.total() > 0 {
        println!(
            "tokens:   {:>6} input + {:>6} output = {:>6}",
            format_number(usage.input_tokens),
            format_number(usage.output_tokens),
            format_number(usage.total()),
        );
    }
    println!("wrote {}", output.display());
}
