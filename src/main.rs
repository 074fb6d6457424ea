use std::process;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use tryllm::{
    build_provider, run_batch,
    utils::{setup_logging, LogConfig},
    web, Args, EngineBuilder, ErrorExt, Features, InferenceConfig, InferenceError,
};

/// Print the diagnostic and leave with -1, as for any unsupported configuration.
fn exit_unsupported(error: &InferenceError) -> ! {
    println!("{error}");
    process::exit(-1);
}

fn load_config(args: Args) -> std::result::Result<InferenceConfig, InferenceError> {
    let config = args.into_config()?;
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let (args, ignored) = Args::parse_known();
    setup_logging(LogConfig::for_run(args.debug)).map_err(anyhow::Error::msg)?;
    if !ignored.is_empty() {
        warn!(?ignored, "ignoring unrecognized arguments");
    }

    let config = match load_config(args) {
        Ok(config) => config,
        Err(e) if e.is_configuration() => exit_unsupported(&e),
        Err(e) => return Err(e.into()),
    };
    info!(
        model_type = %config.model_type,
        task_type = %config.task_type,
        web = config.web,
        features = %Features::detect(),
        "starting tryllm {}",
        tryllm::VERSION
    );

    if config.web {
        let engine = match EngineBuilder::new().with_config(config.clone()).build().await {
            Ok(engine) => engine,
            Err(e) if e.is_configuration() => exit_unsupported(&e),
            Err(e) => return Err(e.into()),
        };
        let engine_info = engine.info();
        info!(
            provider = %engine_info.provider,
            model_path = %engine_info.model_path.display(),
            "model ready"
        );
        web::serve(Arc::new(engine), config.model_type).await?;
        return Ok(());
    }

    let provider = match build_provider(&config) {
        Ok(provider) => provider,
        Err(e) => exit_unsupported(&e.into()),
    };
    info!(provider = %provider.kind(), "provider constructed");

    tokio::task::spawn_blocking(move || run_batch(&provider, &config)).await??;
    Ok(())
}
