//
// Logger - `log` facade backend writing through the text writer
//

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::println;


struct BridgeLogger;

static LOGGER: BridgeLogger = BridgeLogger;

impl Log for BridgeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
	metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
	if self.enabled(record.metadata()) {
	    println!("[{:<5}] {}: {}",
		     record.level(), record.target(), record.args());
	}
    }

    fn flush(&self) {}
}


/// Installs the bridge logger.  Only the first call has any effect.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
