use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub(crate) enum RunOutcome {
    Serve(deskbell::config::AppConfig),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    match resolve_config(&cli) {
        Ok(config) => RunOutcome::Serve(config),
        Err(err) => {
            eprintln!("error: {err}");
            RunOutcome::Exit(2)
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "deskbell",
    version,
    about = "Small dashboard server with a session store and notification center"
)]
struct Cli {
    #[arg(long, env = "DESKBELL_STATE_DIR")]
    state_dir: PathBuf,
    #[arg(long, env = "DESKBELL_APP_NAME", default_value = "Deskbell")]
    app_name: String,
    #[arg(long, env = "DESKBELL_SESSION_TTL", default_value = "24h")]
    session_ttl: String,
    #[arg(long, env = "DESKBELL_LOGIN_DELAY_MS", default_value_t = 800)]
    login_delay_ms: u64,
    #[arg(long, env = "DESKBELL_NOTIFICATION_CAP", default_value_t = 50)]
    notification_cap: usize,
    #[arg(long, env = "DESKBELL_DISMISS_AFTER_MS", default_value_t = 5000)]
    dismiss_after_ms: u64,
    #[arg(long, env = "DESKBELL_FEED_INTERVAL", default_value = "45s")]
    feed_interval: String,
}

fn resolve_config(cli: &Cli) -> Result<deskbell::config::AppConfig, String> {
    let session_ttl = parse_duration_arg(&cli.session_ttl)
        .map_err(|err| format!("invalid --session-ttl: {err}"))?;
    let feed_interval = parse_feed_interval(&cli.feed_interval)
        .map_err(|err| format!("invalid --feed-interval: {err}"))?;
    if cli.notification_cap == 0 {
        return Err("notification cap must be greater than 0".to_string());
    }

    Ok(deskbell::config::AppConfig {
        state_dir: cli.state_dir.clone(),
        app_name: cli.app_name.clone(),
        session_ttl,
        login_delay: Duration::from_millis(cli.login_delay_ms),
        notification_cap: cli.notification_cap,
        dismiss_after: Duration::from_millis(cli.dismiss_after_ms),
        feed_interval,
    })
}

fn parse_duration_arg(raw: &str) -> Result<time::Duration, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("duration cannot be empty".to_string());
    }

    let (amount, unit) = match value.chars().last() {
        Some(ch) if ch.is_ascii_alphabetic() => {
            (&value[..value.len() - 1], ch.to_ascii_lowercase())
        }
        _ => (value, 's'),
    };

    let amount: i64 = amount
        .parse()
        .map_err(|_| format!("invalid duration '{value}'; expected <number>[s|m|h|d]"))?;

    if amount <= 0 {
        return Err("duration must be greater than 0".to_string());
    }

    match unit {
        's' => Ok(time::Duration::seconds(amount)),
        'm' => Ok(time::Duration::minutes(amount)),
        'h' => Ok(time::Duration::hours(amount)),
        'd' => Ok(time::Duration::days(amount)),
        _ => Err(format!(
            "invalid duration '{value}'; expected <number>[s|m|h|d]"
        )),
    }
}

fn parse_feed_interval(raw: &str) -> Result<Duration, String> {
    if raw.trim() == "0" {
        return Ok(Duration::ZERO);
    }
    parse_duration_arg(raw).map(|interval| interval.unsigned_abs())
}
