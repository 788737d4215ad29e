// # subformd - Subscription Form Driver
//
// A THIN integration layer over subform-core:
// - No validation, submission or notification logic lives here
// - All form behavior MUST be in subform-core
// - Configuration is via environment variables ONLY
//
// The binary stands in for the rendering layer. It is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing the runtime
// 3. Registering providers and creating the configured one
// 4. Feeding field changes and submit triggers read from stdin to the controller
// 5. Printing notifications as they appear and disappear
//
// ## Configuration
//
// ### Provider
// - `SUBFORM_PROVIDER_TYPE`: Provider type (brevo)
// - `SUBFORM_API_KEY`: API key (optional; without it every valid submission
//   reports a configuration error). With a key set, a provider that cannot be
//   created is a startup error (exit code 1)
// - `SUBFORM_API_BASE_URL`: API base URL override
// - `SUBFORM_MODE`: `live` (default) or `dry-run`
//
// ### Lists
// - `SUBFORM_LISTS`: Comma-separated `Name=id` pairs, in display order
//   (default: Newsletter=2, Product Updates=3, Events=5, Research=7)
//
// ### Controller
// - `SUBFORM_SUBMIT_TIMEOUT_SECS`: Upper bound on one submission
// - `SUBFORM_DISMISS_MS`: How long a notification stays visible
// - `SUBFORM_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export SUBFORM_API_KEY=xkeysib-...
// export SUBFORM_LISTS="Newsletter=2,Product Updates=3,Events=5"
//
// printf 'set 2 email jane@example.com\nsubmit 2\n' | subformd
// ```

use anyhow::{Context, Result};
use std::env;
use std::process::ExitCode;
use std::time::Duration;
use subform_core::{
    ContactProvider, ControllerConfig, ControllerEvent, Field, ListDescriptor, ListId,
    Notification, NotificationKind, ProviderConfig, ProviderRegistry, SubformConfig,
    SubmitDisposition, SubscriptionController,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum SubformExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<SubformExitCode> for ExitCode {
    fn from(code: SubformExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// The four-list deployment used when `SUBFORM_LISTS` is unset
const DEFAULT_LISTS: &str = "Newsletter=2,Product Updates=3,Events=5,Research=7";

/// Application configuration
struct Config {
    provider_type: String,
    api_key: Option<String>,
    api_base_url: Option<String>,
    lists: Vec<ListDescriptor>,
    submit_timeout_secs: Option<u64>,
    dismiss_ms: Option<u64>,
    mode: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            provider_type: env::var("SUBFORM_PROVIDER_TYPE")
                .unwrap_or_else(|_| "brevo".to_string()),
            api_key: env::var("SUBFORM_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            api_base_url: env::var("SUBFORM_API_BASE_URL").ok(),
            lists: parse_lists(
                &env::var("SUBFORM_LISTS").unwrap_or_else(|_| DEFAULT_LISTS.to_string()),
            )?,
            submit_timeout_secs: parse_env("SUBFORM_SUBMIT_TIMEOUT_SECS")?,
            dismiss_ms: parse_env("SUBFORM_DISMISS_MS")?,
            mode: env::var("SUBFORM_MODE").unwrap_or_else(|_| "live".to_string()),
            log_level: env::var("SUBFORM_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// A missing API key is deliberately not an error here.
    fn validate(&self) -> Result<()> {
        match self.provider_type.as_str() {
            "brevo" => {}
            _ => anyhow::bail!(
                "SUBFORM_PROVIDER_TYPE '{}' is not supported. \
                Supported providers: brevo",
                self.provider_type
            ),
        }

        if self.lists.is_empty() {
            anyhow::bail!(
                "SUBFORM_LISTS must contain at least one list. \
                Set it via: export SUBFORM_LISTS=\"Newsletter=2,Events=5\""
            );
        }

        match self.mode.to_lowercase().as_str() {
            "live" | "dry-run" => {}
            _ => anyhow::bail!(
                "SUBFORM_MODE '{}' is not valid. Valid modes: live, dry-run",
                self.mode
            ),
        }

        if let Some(timeout) = self.submit_timeout_secs
            && !(1..=300).contains(&timeout)
        {
            anyhow::bail!(
                "SUBFORM_SUBMIT_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                timeout
            );
        }

        if let Some(dismiss) = self.dismiss_ms
            && !(500..=60_000).contains(&dismiss)
        {
            anyhow::bail!(
                "SUBFORM_DISMISS_MS must be between 500 and 60000 milliseconds. Got: {}",
                dismiss
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "SUBFORM_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        // Catalog rules (duplicate ids, blank names) and URL scheme
        self.to_subform_config().validate()?;

        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        self.mode.eq_ignore_ascii_case("dry-run")
    }

    /// Build the library configuration
    fn to_subform_config(&self) -> SubformConfig {
        let mut controller = ControllerConfig::default();
        if let Some(timeout) = self.submit_timeout_secs {
            controller.submission_timeout_secs = timeout;
        }
        if let Some(dismiss) = self.dismiss_ms {
            controller.notification_dismiss_ms = dismiss;
        }

        let provider = ProviderConfig::Brevo {
            api_key: self.api_key.clone(),
            base_url: self.api_base_url.clone(),
            timeout_secs: controller.submission_timeout_secs,
            dry_run: self.is_dry_run(),
        };

        SubformConfig::new(self.lists.clone())
            .with_provider(provider)
            .with_controller(controller)
    }
}

/// Parse an optional numeric environment variable
fn parse_env(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a positive integer. Got: {}", name, raw)),
        Err(_) => Ok(None),
    }
}

/// Parse `Name=id,Name=id` into list descriptors
fn parse_lists(raw: &str) -> Result<Vec<ListDescriptor>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, id) = entry
                .rsplit_once('=')
                .with_context(|| format!("SUBFORM_LISTS entry '{}' is not Name=id", entry))?;
            let id: i64 = id
                .trim()
                .parse()
                .with_context(|| format!("SUBFORM_LISTS entry '{}' has a non-numeric id", entry))?;
            Ok(ListDescriptor::new(name.trim(), id))
        })
        .collect()
}

/// One line of driver input
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Help,
    Lists,
    Set {
        list_id: ListId,
        field: Field,
        value: String,
    },
    Reset(ListId),
    Submit(ListId),
    Dismiss,
    Quit,
}

/// Parse one input line; blank lines yield `None`
///
/// Tokens are separated by any run of whitespace. For `set`, everything after
/// the field name is the value.
fn parse_command(line: &str) -> Result<Option<Command>> {
    let (verb, rest) = next_token(line);
    if verb.is_empty() {
        return Ok(None);
    }

    let command = match verb.to_lowercase().as_str() {
        "help" | "?" => Command::Help,
        "lists" | "show" => Command::Lists,
        "set" => {
            let (list_id, rest) = next_token(rest);
            let list_id = parse_list_id(list_id)?;
            let (field, value) = next_token(rest);
            if field.is_empty() {
                anyhow::bail!("missing field name");
            }
            Command::Set {
                list_id,
                field: field.parse::<Field>()?,
                value: value.trim().to_string(),
            }
        }
        "reset" => Command::Reset(parse_list_id(next_token(rest).0)?),
        "submit" => Command::Submit(parse_list_id(next_token(rest).0)?),
        "dismiss" => Command::Dismiss,
        "quit" | "exit" => Command::Quit,
        other => anyhow::bail!("unknown command '{}' (try 'help')", other),
    };

    Ok(Some(command))
}

/// Split off the first whitespace-delimited token
fn next_token(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(end) => (&input[..end], &input[end..]),
        None => (input, ""),
    }
}

fn parse_list_id(raw: &str) -> Result<ListId> {
    if raw.is_empty() {
        anyhow::bail!("missing list id");
    }
    let id: i64 = raw
        .parse()
        .with_context(|| format!("list id must be an integer. Got: {}", raw))?;
    Ok(ListId(id))
}

/// Create the configured provider
///
/// Without a credential there is nothing to build and the form runs with no
/// provider. A credential that cannot be turned into a provider (unknown
/// type, rejected settings) is a startup error.
fn build_provider(
    registry: &ProviderRegistry,
    provider_config: &ProviderConfig,
) -> Result<Option<Box<dyn ContactProvider>>> {
    if !provider_config.has_credential() {
        warn!("SUBFORM_API_KEY is not set; submissions will report a configuration error");
        return Ok(None);
    }

    let provider = registry
        .create_provider(provider_config)
        .with_context(|| {
            format!(
                "Failed to create '{}' provider (registered: {:?})",
                provider_config.type_name(),
                registry.registered_providers()
            )
        })?;
    info!("Using {} provider", provider.provider_name());
    Ok(Some(provider))
}

fn provider_registry() -> ProviderRegistry {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "brevo")]
    {
        info!("Registering Brevo provider");
        subform_provider_brevo::register(&registry);
    }

    registry
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return SubformExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return SubformExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so stdout stays the rendered form
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SubformExitCode::ConfigError.into();
    }

    info!("Starting subformd");
    info!("Configuration loaded: {} list(s)", config.lists.len());

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SubformExitCode::RuntimeError.into();
        }
    };

    let registry = provider_registry();
    let provider = match build_provider(&registry, &config.to_subform_config().provider) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Provider setup error: {:#}", e);
            return SubformExitCode::ConfigError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_driver(config, provider).await {
            error!("Driver error: {:#}", e);
            SubformExitCode::RuntimeError
        } else {
            SubformExitCode::CleanShutdown
        }
    });

    result.into()
}

/// How the input loop ended
enum Exit {
    Signal(&'static str),
    Quit,
    InputClosed,
}

/// Run the driver until quit, end of input or a shutdown signal
async fn run_driver(config: Config, provider: Option<Box<dyn ContactProvider>>) -> Result<()> {
    let subform_config = config.to_subform_config();

    let submit_timeout = subform_config.controller.submission_timeout();
    let (controller, mut events) = SubscriptionController::new(provider, subform_config)?;

    let notifications = tokio::spawn(render_notifications(controller.notifier().subscribe()));
    let event_log = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    render_lists(&controller).await;

    let shutdown = wait_for_shutdown_signal();
    tokio::pin!(shutdown);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let exit = loop {
        tokio::select! {
            signal = &mut shutdown => break Exit::Signal(signal?),
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break Exit::InputClosed;
                };
                match parse_command(&line) {
                    Ok(Some(Command::Quit)) => break Exit::Quit,
                    Ok(Some(command)) => execute(&controller, command).await,
                    Ok(None) => {}
                    Err(e) => println!("error: {:#}", e),
                }
            }
        }
    };

    match exit {
        Exit::Signal(signal) => info!("Received shutdown signal: {}", signal),
        Exit::Quit => info!("Quit requested"),
        Exit::InputClosed => {
            // Piped input: let outstanding submissions report before exiting
            info!("Input closed, waiting for outstanding submissions");
            tokio::select! {
                signal = &mut shutdown => info!("Received shutdown signal: {}", signal?),
                _ = tokio::time::timeout(submit_timeout + Duration::from_secs(1), wait_idle(&controller)) => {}
            }
        }
    }

    let cancelled = controller.shutdown().await;
    if !cancelled.is_empty() {
        info!("Cancelled {} outstanding submission(s)", cancelled.len());
    }

    // Let the renderer print the last notification
    tokio::task::yield_now().await;
    notifications.abort();
    event_log.abort();

    info!("Shutting down subformd");
    Ok(())
}

async fn execute(controller: &SubscriptionController, command: Command) {
    match command {
        Command::Help => print_help(),
        Command::Lists => render_lists(controller).await,
        Command::Set {
            list_id,
            field,
            value,
        } => {
            if !controller.update_field(list_id, field, value).await {
                println!("error: unknown list {}", list_id);
            }
        }
        Command::Reset(list_id) => {
            if !controller.reset_draft(list_id).await {
                println!("error: unknown list {}", list_id);
            }
        }
        Command::Submit(list_id) => match controller.submit(list_id).await {
            SubmitDisposition::Dispatched => println!("submitting to list {}...", list_id),
            SubmitDisposition::Ignored => println!("list {} is already submitting", list_id),
            SubmitDisposition::UnknownList => println!("error: unknown list {}", list_id),
            // The notification carries the message
            SubmitDisposition::Rejected(_) => {}
        },
        Command::Dismiss => controller.notifier().dismiss(),
        Command::Quit => {}
    }
}

async fn wait_idle(controller: &SubscriptionController) {
    while controller.views().await.iter().any(|view| view.is_in_flight()) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

async fn render_lists(controller: &SubscriptionController) {
    for view in controller.views().await {
        println!(
            "[{}] {} ({:?}) first={:?} last={:?} email={:?}",
            view.descriptor.id,
            view.descriptor.name,
            view.state,
            view.draft.first_name,
            view.draft.last_name,
            view.draft.email,
        );
    }
}

async fn render_notifications(mut stream: WatchStream<Notification>) {
    while let Some(notification) = stream.next().await {
        if !notification.visible {
            debug!("Notification hidden");
            continue;
        }
        let label = match notification.kind {
            NotificationKind::Success => "ok",
            NotificationKind::Error => "error",
        };
        println!("({}) {}", label, notification.message);
    }
}

fn log_event(event: &ControllerEvent) {
    match event {
        ControllerEvent::SubmissionStarted { list_id, ticket } => {
            debug!("List {} submission {} started", list_id, ticket)
        }
        ControllerEvent::SubmissionSucceeded { list_id, outcome } => {
            debug!("List {} submission succeeded: {:?}", list_id, outcome)
        }
        ControllerEvent::SubmissionFailed { list_id, error } => {
            debug!("List {} submission failed: {:?}", list_id, error)
        }
        ControllerEvent::SubmissionRejected { list_id, error } => {
            debug!("List {} submission refused: {:?}", list_id, error)
        }
        ControllerEvent::SubmissionIgnored { list_id } => {
            debug!("List {} submit ignored while in flight", list_id)
        }
        ControllerEvent::SubmissionCancelled { list_id } => {
            debug!("List {} submission cancelled", list_id)
        }
    }
}

fn print_help() {
    println!("commands:");
    println!("  lists                      show every list with its draft and state");
    println!("  set <id> <field> <value>   field is firstName, lastName or email");
    println!("  reset <id>                 clear a list's draft");
    println!("  submit <id>                subscribe the list's draft");
    println!("  dismiss                    hide the current notification");
    println!("  quit");
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
