use indicatif::ProgressStyle;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

const BAR_TEMPLATE: &str = "[{elapsed_precise} / {eta_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}";
const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner:.cyan} {pos:>9} {msg}";

fn style(template: &str) -> Option<ProgressStyle> {
    ProgressStyle::default_bar()
        .template(template)
        .ok()
        .map(|s| s.progress_chars("##-"))
}

/// Attaches a progress bar of `len` steps to `span`. Drawn only while the
/// `IndicatifLayer` is installed; a no-op otherwise.
pub fn progress_bar(span: &Span, len: u64, msg: &str) {
    if let Some(style) = style(BAR_TEMPLATE) {
        span.pb_set_style(&style);
    }
    span.pb_set_length(len);
    span.pb_set_message(msg);
}

/// Like [`progress_bar`] for passes whose length is unknown up front
pub fn progress_spinner(span: &Span, msg: &str) {
    if let Some(style) = style(SPINNER_TEMPLATE) {
        span.pb_set_style(&style);
    }
    span.pb_set_message(msg);
}
