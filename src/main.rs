use deepseek_redis::config::Settings;
use deepseek_redis::connection::ReplyWriter;
use deepseek_redis::{logging, WireValue};
use miette::Result;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
  let settings = Settings::load()?;

  let _guard = logging::init(&settings)?;

  if !settings.conf_file_loaded {
    warn!(
      path = %settings.conf_file.display(),
      "config file not found, using defaults and flags"
    );
  }

  info!(
    model = %settings.model,
    url = %settings.url,
    api_key = %settings.redacted_api_key(),
    log_dir = %settings.log_dir.display(),
    log_level = %settings.log_level,
    shard_num = settings.shard_num,
    chan_buffer_size = settings.chan_buffer_size,
    "settings loaded"
  );

  for (key, value) in &settings.others {
    debug!(key = %key, value = %value, "keeping unrecognized setting");
  }

  // Supervisors wait for this reply before routing traffic.
  let mut stdout = ReplyWriter::new(tokio::io::stdout());
  stdout.send(&WireValue::simple_string("OK")).await?;
  stdout.flush().await?;

  Ok(())
}
