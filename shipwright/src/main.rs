use std::io::Write;
use std::panic;
use std::sync::Mutex;

// Import everything from the lib version of ourselves
use camino::Utf8PathBuf;
use clap::Parser;
use cli::{Cli, Commands, OutputFormat, ReleaseArgs, SchemaArgs, SchemaKind};
use console::Term;
use lazy_static::lazy_static;
use miette::{Diagnostic, IntoDiagnostic};
use shipwright::{do_release, pipeline, Cancellation, RunOptions};
use shipwright_schema::DistReport;
use thiserror::Error;
use tracing::{error, level_filters::LevelFilter, warn};

mod cli;

type ReportErrorFunc = dyn Fn(&miette::Report) + Send + Sync + 'static;

lazy_static! {
    static ref REPORT_ERROR: Mutex<Option<Box<ReportErrorFunc>>> = Mutex::new(None);
}

fn set_report_errors_as_json() {
    *REPORT_ERROR.lock().unwrap() = Some(Box::new(move |error| {
        // Manually invoke JSONReportHandler to format the error as a report
        // to out_.
        let mut report = String::new();
        miette::JSONReportHandler::new()
            .render_report(&mut report, error.as_ref())
            .unwrap();
        writeln!(&mut Term::stdout(), r#"{{"error": {report}}}"#).unwrap();
    }));
}

fn report_error(error: &miette::Report) {
    {
        let guard = REPORT_ERROR.lock().unwrap();
        if let Some(do_report) = &*guard {
            do_report(error);
            return;
        }
    }
    error!("{:?}", error);
}

fn main() {
    let cli = Cli::parse();

    let level = match &cli.command {
        Commands::Release(args) if args.debug => LevelFilter::DEBUG,
        _ => cli.verbose,
    };
    // Init the logger
    tracing_subscriber::fmt::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .with_ansi(console::colors_enabled_stderr())
        .init();

    // Control how errors are formatted by setting the miette hook. This will
    // only be used for errors presented to humans, when formatting an error as
    // JSON, it will be handled by a custom `report_error` override, bypassing
    // the hook.
    miette::set_hook(Box::new(move |_| {
        let graphical_theme = if console::colors_enabled_stderr() {
            miette::GraphicalTheme::unicode()
        } else {
            miette::GraphicalTheme::unicode_nocolor()
        };
        Box::new(
            miette::MietteHandlerOpts::new()
                .graphical_theme(graphical_theme)
                .build(),
        )
    }))
    .expect("failed to initialize error handler");

    // Now that miette is set up, use it to format panics.
    panic::set_hook(Box::new(move |panic_info| {
        let payload = panic_info.payload();
        let message = if let Some(msg) = payload.downcast_ref::<&str>() {
            msg
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            &msg[..]
        } else {
            "something went wrong"
        };

        #[derive(Debug, Error, Diagnostic)]
        #[error("{message}")]
        pub struct PanicError {
            pub message: String,
            #[help]
            pub help: Option<String>,
        }

        report_error(
            &miette::Report::from(PanicError {
                message: message.to_owned(),
                help: panic_info
                    .location()
                    .map(|loc| format!("at {}:{}:{}", loc.file(), loc.line(), loc.column())),
            })
            .wrap_err("shipwright panicked"),
        );
    }));

    // If we're outputting JSON, replace the error report method such that it
    // writes errors out to the normal output stream as JSON.
    if cli.output_format == OutputFormat::Json {
        set_report_errors_as_json();
    }

    let main_result = real_main(&cli);

    let _ = main_result.map_err(|e| {
        report_error(&e);
        std::process::exit(-1);
    });
}

fn real_main(cli: &Cli) -> Result<(), miette::Report> {
    match &cli.command {
        Commands::Release(args) => cmd_release(cli, args),
        Commands::Schema(args) => cmd_schema(args),
    }
}

fn cmd_release(cli: &Cli, args: &ReleaseArgs) -> Result<(), miette::Report> {
    // The release stage drives its uploads on this runtime
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let _guard = runtime.enter();

    let cancel = Cancellation::new();
    {
        let cancel = cancel.clone();
        runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, stopping after the current stage");
                cancel.cancel();
            }
        });
    }

    let opts = RunOptions {
        config: args.config.clone(),
        builds: args.builds.clone(),
        snapshot: args.snapshot,
        skip_publish: args.skip_publish,
        skip_validate: args.skip_validate,
        parallelism: args.parallelism,
        release_notes: args.release_notes.clone(),
    };
    let project_dir = Utf8PathBuf::from_path_buf(std::env::current_dir().into_diagnostic()?)
        .map_err(|p| miette::miette!("current dir isn't utf8: {}", p.display()))?;
    let mut ctx = shipwright::config::load_context(&project_dir, &opts)?;
    let report = do_release(&mut ctx, &pipeline(None), &cancel)?;

    let mut out = Term::stdout();
    match cli.output_format {
        OutputFormat::Human => print_human(&mut out, &report).into_diagnostic()?,
        OutputFormat::Json => print_json(&mut out, &report).into_diagnostic()?,
    }
    Ok(())
}

fn cmd_schema(args: &SchemaArgs) -> Result<(), miette::Report> {
    let schema = match args.kind {
        SchemaKind::Builds => shipwright_schema::builds_json_schema(),
        SchemaKind::Config => shipwright_schema::project_json_schema(),
        SchemaKind::Report => DistReport::json_schema(),
    };
    let json = serde_json::to_string_pretty(&schema).into_diagnostic()?;
    writeln!(Term::stdout(), "{json}").into_diagnostic()?;
    Ok(())
}

fn print_human(out: &mut Term, report: &DistReport) -> Result<(), std::io::Error> {
    writeln!(out, "released {} ({})", report.version, report.tag)?;
    for artifact in &report.artifacts {
        writeln!(out, "  {artifact}")?;
    }
    Ok(())
}

fn print_json(out: &mut Term, report: &DistReport) -> Result<(), std::io::Error> {
    let string = serde_json::to_string_pretty(report)?;
    writeln!(out, "{string}")?;
    Ok(())
}
