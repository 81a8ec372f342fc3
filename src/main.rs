//! SoVITS Panel - command-line control panel for a GPT-SoVITS backend

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sovits_panel::api::{AudioUpload, BackendClient, InferenceConfigPatch};
use sovits_panel::chat::{ChatStore, FileSettings, OpenAiClient, Role};
use sovits_panel::config::Config;
use sovits_panel::store::{AudioInput, BackendStore};
use sovits_panel::PanelResult;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Backend base URL (overrides the config file)
    #[arg(long)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show backend status
    Status,
    /// List SoVITS models, or switch with --set
    Models {
        #[arg(long)]
        set: Option<String>,
    },
    /// List characters, or switch with --set
    Characters {
        #[arg(long)]
        set: Option<String>,
    },
    /// Show inference config, or update fields with --set key=value
    Inference {
        #[arg(long, num_args = 1..)]
        set: Vec<String>,
    },
    /// Synthesize TEXT into an audio file
    Tts {
        text: String,
        #[arg(short, long, default_value = "output.wav")]
        out: PathBuf,
    },
    /// Speech recognition
    Asr {
        #[command(subcommand)]
        action: AsrAction,
    },
    /// Voice activity detection
    Vad {
        #[command(subcommand)]
        action: VadAction,
    },
    /// Interactive chat with voiced replies
    Chat {
        /// Store conversations on the backend
        #[arg(long)]
        persist: bool,
    },
    /// Import exported conversation files
    Import { files: Vec<PathBuf> },
}

#[derive(Subcommand, Debug)]
enum AsrAction {
    Info,
    Load,
    Unload,
    Recognize {
        file: PathBuf,
        /// Always use plain recognition
        #[arg(long)]
        no_vad: bool,
    },
}

#[derive(Subcommand, Debug)]
enum VadAction {
    Health,
    Detect { file: PathBuf },
    Split {
        file: PathBuf,
        #[arg(long, default_value = "wav")]
        format: String,
    },
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load()?;
    if let Some(url) = args.backend.clone() {
        config.backend_url = url;
    }

    // Setup logging
    let level = if args.verbose {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(
        "🎙️ SoVITS Panel v{} -> {}",
        env!("CARGO_PKG_VERSION"),
        config.backend_url
    );

    let client = Arc::new(BackendClient::from_config(&config)?);
    let backend = Arc::new(BackendStore::new(client.clone()));

    match args.command {
        Command::Status => print_json(&backend.system().fetch_system_status().await?)?,
        Command::Models { set } => {
            let models = backend.models();
            if let Some(name) = set {
                print_json(&models.set_sovits_model(&name).await?)?;
            } else {
                for model in models.fetch_sovits_models().await? {
                    let marker = if model.is_current { "*" } else { " " };
                    println!("{} {}  ({})", marker, model.name, model.path);
                }
            }
        }
        Command::Characters { set } => {
            let characters = backend.characters();
            if let Some(name) = set {
                print_json(&characters.set_character(&name).await?)?;
            } else {
                for character in characters.fetch_characters().await? {
                    let marker = if character.is_current { "*" } else { " " };
                    println!("{} {}", marker, character.name);
                }
            }
        }
        Command::Inference { set } => {
            let inference = backend.inference();
            let config = if set.is_empty() {
                inference.fetch_inference_config().await?
            } else {
                let patch = InferenceConfigPatch::from_pairs(set.iter().map(String::as_str))?;
                inference.update_inference_config(&patch).await?
            };
            print_json(&config)?;
        }
        Command::Tts { text, out } => {
            let audio = backend.tts().text_to_speech(&text).await?;
            tokio::fs::write(&out, &audio)
                .await
                .with_context(|| format!("writing {}", out.display()))?;
            info!("💾 Wrote {} bytes to {}", audio.len(), out.display());
        }
        Command::Asr { action } => {
            let asr = backend.asr();
            match action {
                AsrAction::Info => print_json(&asr.fetch_asr_model_info().await?)?,
                AsrAction::Load => print_json(&asr.load_asr_model().await?)?,
                AsrAction::Unload => print_json(&asr.unload_asr_model().await?)?,
                AsrAction::Recognize { file, no_vad } => {
                    let result = asr.quick_recognize(AudioInput::File(file), !no_vad).await?;
                    print_json(&result)?;
                }
            }
        }
        Command::Vad { action } => {
            let vad = backend.vad();
            match action {
                VadAction::Health => print_json(&vad.fetch_vad_status().await?)?,
                VadAction::Detect { file } => {
                    let upload = AudioUpload::from_path(&file).await?;
                    print_json(&vad.detect_vad_segments(&upload).await?)?;
                }
                VadAction::Split { file, format } => {
                    let upload = AudioUpload::from_path(&file).await?;
                    print_json(&vad.split_audio_by_vad(&upload, &format).await?)?;
                }
            }
        }
        Command::Chat { persist } => {
            let persist = persist || config.persist_conversations;
            let chat = build_chat(&config, backend, client, persist);
            run_chat(&chat, &config).await?;
        }
        Command::Import { files } => {
            let chat = build_chat(&config, backend, client, config.persist_conversations);
            let summary = chat.import_files(&files).await;
            print_json(&summary)?;
        }
    }

    Ok(())
}

fn build_chat(
    config: &Config,
    backend: Arc<BackendStore>,
    client: Arc<BackendClient>,
    persist: bool,
) -> ChatStore {
    let builder = ChatStore::builder(
        backend,
        Arc::new(OpenAiClient::new()),
        Arc::new(FileSettings::new(&config.ai_config_path)),
    )
    .auto_generate_audio(config.auto_generate_audio);
    if persist {
        builder.persistence(client).build()
    } else {
        builder.build()
    }
}

const CHAT_HELP: &str =
    "/new /list /switch N /regen /rollback N /persona NAME /audio /export /import FILE... /quit";

async fn run_chat(chat: &ChatStore, config: &Config) -> Result<()> {
    chat.initialize_config(false).await?;
    if chat.is_persisted() {
        let count = chat.load_conversations().await?;
        info!("📚 {} stored conversations", count);
    }
    println!("Persona: {}  (commands: {})", chat.current_persona().name, CHAT_HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let outcome = match command {
            "/quit" => break,
            "/new" => chat.create_conversation(None, None).await.map(|c| {
                println!("New conversation: {}", c.title);
            }),
            "/list" => {
                let current = chat.current_conversation_id();
                for (i, conversation) in chat.conversations().iter().enumerate() {
                    let active = current.as_deref() == Some(conversation.id.as_str());
                    println!(
                        "{} {}: {} ({} messages)",
                        if active { "*" } else { " " },
                        i,
                        conversation.title,
                        conversation.messages.len()
                    );
                }
                Ok(())
            }
            "/switch" => match rest
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| chat.conversations().get(i).cloned())
            {
                Some(conversation) => chat.switch_conversation(&conversation.id),
                None => {
                    println!("usage: /switch N (see /list)");
                    Ok(())
                }
            },
            "/regen" => regenerate_last(chat).await,
            "/rollback" => match (rest.trim().parse::<usize>(), chat.current_conversation_id()) {
                (Ok(index), Some(id)) => chat.rollback_to_message(&id, index).await,
                _ => {
                    println!("usage: /rollback N (with an active conversation)");
                    Ok(())
                }
            },
            "/persona" => chat.set_persona_by_name(rest.trim()).await,
            "/audio" => save_last_audio(chat, Path::new(&config.audio_dir)).await,
            "/export" => match chat.current_conversation_id() {
                Some(id) => chat
                    .export_to_dir(&id, Path::new(&config.export_dir))
                    .await
                    .map(|path| println!("Exported to {}", path.display())),
                None => Ok(()),
            },
            "/import" => {
                let files: Vec<PathBuf> = rest.split_whitespace().map(PathBuf::from).collect();
                let summary = chat.import_files(&files).await;
                println!("Imported {}, failed {}", summary.success, summary.failed);
                for error in summary.errors {
                    println!("  {error}");
                }
                Ok(())
            }
            _ if command.starts_with('/') => {
                println!("commands: {CHAT_HELP}");
                Ok(())
            }
            _ => chat.send_message(line, None).await.map(|reply| {
                println!("{}", reply.content);
            }),
        };

        if let Err(e) = outcome {
            warn!("❌ {}", e.user_message());
        }
    }

    chat.wait_for_audio().await;
    Ok(())
}

async fn regenerate_last(chat: &ChatStore) -> PanelResult<()> {
    let Some(conversation) = chat.current_conversation() else {
        return Ok(());
    };
    let Some(index) = conversation
        .messages
        .iter()
        .rposition(|m| m.role == Role::Assistant)
    else {
        return Ok(());
    };
    let reply = chat.regenerate_response(&conversation.id, index).await?;
    println!("{}", reply.content);
    Ok(())
}

/// Save the newest voiced message of the active conversation
async fn save_last_audio(chat: &ChatStore, dir: &Path) -> PanelResult<()> {
    chat.wait_for_audio().await;
    let Some(conversation) = chat.current_conversation() else {
        return Ok(());
    };
    let Some(message) = conversation
        .messages
        .iter()
        .rev()
        .find(|m| m.current_audio().is_some())
    else {
        println!("no audio yet");
        return Ok(());
    };
    let path = dir.join(format!("{}.wav", message.id));
    chat.save_message_audio(&conversation.id, &message.id, &path).await?;
    println!("Saved {}", path.display());
    Ok(())
}
