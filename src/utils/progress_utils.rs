use indicatif::{ProgressBar, ProgressStyle};

/// Batch progress bar, or `None` if the template cannot be parsed
pub fn progress_bar(len: u64, msg: String) -> Option<ProgressBar> {
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise} / {eta_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
        .ok()?
        .progress_chars("##-");

    let bar = ProgressBar::new(len).with_style(style).with_message(msg);

    Some(bar)
}
