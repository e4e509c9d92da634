use flexi_logger::DeferredNow;
use log::{Level, Record};

/// `level: message`, with the module path at debug and trace.
pub fn cli_format(
    w: &mut dyn std::io::Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    match record.level() {
        Level::Debug | Level::Trace => write!(
            w,
            "{} [{}] {}",
            record.level().as_str().to_lowercase(),
            record.module_path().unwrap_or("<unnamed>"),
            record.args()
        ),
        level => write!(w, "{}: {}", level.as_str().to_lowercase(), record.args()),
    }
}
