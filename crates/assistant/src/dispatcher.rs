//! Turn dispatch: one user message in, one assistant turn out.
//!
//! A send appends the user turn, calls the adapter for the selected mode with
//! a snapshot of the conversation history, and then writes either the
//! assistant turn (recording the exchange) or an error turn (recording
//! nothing). Only one send may be in flight at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use providers::{AdapterRegistry, ErrorKind, ProviderError};
use shared::settings::AppSettings;
use shared::{
    ConversationHistory, Mode, ModeRequest, ProviderResult, RequestError, Turn, TurnId, TurnKind,
};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::audio::{AudioBackend, AudioPlayer, PlaybackError};
use crate::events::{title_base, Artifact, ArtifactKind, DispatchEvent, Notification};
use crate::transcript::Transcript;

/// `model_used` tag of the greeting turn
pub const GREETING_LABEL: &str = "OmniAssist";

/// Reasons a send is refused before anything is appended
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("A request is already in progress")]
    Busy,
    #[error("Nothing to send: the {mode} request text is empty")]
    EmptyInput { mode: Mode },
}

impl From<RequestError> for DispatchError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::EmptyInput { mode } => DispatchError::EmptyInput { mode },
        }
    }
}

/// How an accepted send ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The assistant turn was written and the exchange recorded
    Completed { turn_id: TurnId },
    /// An error turn was written; history is unchanged
    Failed { turn_id: TurnId, kind: ErrorKind },
    /// The conversation moved on while the call was in flight
    Discarded,
}

struct State {
    transcript: Transcript,
    history: ConversationHistory,
    /// Bumped on reset so late results from an earlier conversation are dropped
    generation: u64,
}

/// Rendered form of a successful provider result
struct Rendered {
    content: String,
    summary: String,
    spoken: Option<String>,
    audio: Option<String>,
    artifact: Artifact,
}

pub struct Dispatcher {
    registry: AdapterRegistry,
    greeting: Option<String>,
    auto_speak: bool,
    state: Mutex<State>,
    busy: AtomicBool,
    player: AudioPlayer,
    events: Option<UnboundedSender<DispatchEvent>>,
}

/// Holds the busy flag for one send and clears it on every exit path.
struct SendGuard<'a> {
    dispatcher: &'a Dispatcher,
    loading: bool,
}

impl<'a> SendGuard<'a> {
    fn acquire(dispatcher: &'a Dispatcher) -> Option<Self> {
        dispatcher
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self {
            dispatcher,
            loading: false,
        })
    }

    fn start_loading(&mut self) {
        self.loading = true;
        self.dispatcher.emit(DispatchEvent::Loading(true));
    }
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        self.dispatcher.busy.store(false, Ordering::Release);
        if self.loading {
            self.dispatcher.emit(DispatchEvent::Loading(false));
        }
    }
}

impl Dispatcher {
    pub fn new(
        registry: AdapterRegistry,
        settings: &AppSettings,
        audio: Arc<dyn AudioBackend>,
    ) -> Self {
        let greeting = settings.greeting.clone().filter(|g| !g.trim().is_empty());
        let mut transcript = Transcript::new();
        if let Some(greeting) = &greeting {
            transcript.push(greeting_turn(greeting));
        }
        Self {
            registry,
            greeting,
            auto_speak: settings.auto_speak,
            state: Mutex::new(State {
                transcript,
                history: ConversationHistory::new(),
                generation: 0,
            }),
            busy: AtomicBool::new(false),
            player: AudioPlayer::new(audio),
            events: None,
        }
    }

    /// Dispatcher over the stock adapters built from `settings`.
    pub fn from_settings(
        settings: &AppSettings,
        audio: Arc<dyn AudioBackend>,
    ) -> Result<Self, ProviderError> {
        let registry = AdapterRegistry::from_settings(settings)?;
        Ok(Self::new(registry, settings, audio))
    }

    /// Sends every state change to `sender`.
    pub fn with_events(mut self, sender: UnboundedSender<DispatchEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Runs one user turn through the adapter for `mode`.
    ///
    /// Provider failures become an error turn and `Ok(Failed)`. `Err` means
    /// the send was refused and nothing was appended.
    pub async fn send(&self, text: &str, mode: Mode) -> Result<DispatchOutcome, DispatchError> {
        let mut guard = SendGuard::acquire(self).ok_or(DispatchError::Busy)?;
        let request = ModeRequest::from_user_text(mode, text)?;

        let (generation, snapshot, placeholder) = {
            let mut state = self.state.lock();
            let user_turn = Turn::user(text, mode);
            state.transcript.push(user_turn.clone());
            self.emit(DispatchEvent::TurnAppended(user_turn));

            let placeholder = match &request {
                ModeRequest::Image { prompt } => {
                    let turn =
                        Turn::placeholder(format!("Generating image for: \"{}\"...", prompt), mode);
                    let id = turn.id;
                    state.transcript.push(turn.clone());
                    self.emit(DispatchEvent::TurnAppended(turn));
                    Some(id)
                }
                _ => None,
            };
            (state.generation, state.history.clone(), placeholder)
        };
        guard.start_loading();

        let result = match self.registry.get(mode) {
            Some(adapter) => {
                tracing::debug!("dispatching {} request to {}", mode, adapter.name());
                adapter.execute(&request, &snapshot).await
            }
            None => Err(ProviderError::Config(format!(
                "No adapter is registered for {} mode.",
                mode
            ))),
        };

        let outcome = match result {
            Ok(result) => {
                let rendered = render(text, result);
                let outcome = self.complete(generation, placeholder, mode, text, &rendered);
                if let DispatchOutcome::Completed { turn_id } = outcome {
                    self.after_success(generation, turn_id, mode, rendered).await;
                }
                outcome
            }
            Err(err) => self.fail(generation, placeholder, mode, err),
        };
        Ok(outcome)
    }

    fn complete(
        &self,
        generation: u64,
        placeholder: Option<TurnId>,
        mode: Mode,
        user_text: &str,
        rendered: &Rendered,
    ) -> DispatchOutcome {
        let mut state = self.state.lock();
        if state.generation != generation {
            tracing::info!("conversation was reset; dropping {} result", mode);
            return DispatchOutcome::Discarded;
        }

        let turn = match placeholder {
            Some(id) => {
                let content = rendered.content.clone();
                let audio = rendered.audio.clone();
                let updated = state.transcript.update(id, |turn| {
                    turn.content = content;
                    turn.kind = TurnKind::Message;
                    turn.audio_data_uri = audio;
                });
                match updated {
                    Some(turn) => {
                        self.emit(DispatchEvent::TurnUpdated(turn.clone()));
                        turn
                    }
                    None => {
                        tracing::info!("placeholder {} is gone; dropping {} result", id, mode);
                        return DispatchOutcome::Discarded;
                    }
                }
            }
            None => {
                let mut turn = Turn::assistant(&rendered.content, mode);
                turn.audio_data_uri = rendered.audio.clone();
                state.transcript.push(turn.clone());
                self.emit(DispatchEvent::TurnAppended(turn.clone()));
                turn
            }
        };

        state.history.record(user_text, &rendered.summary);
        drop(state);

        self.emit(DispatchEvent::Artifact(rendered.artifact.clone()));
        tracing::info!("{} turn completed", mode);
        DispatchOutcome::Completed { turn_id: turn.id }
    }

    fn fail(
        &self,
        generation: u64,
        placeholder: Option<TurnId>,
        mode: Mode,
        err: ProviderError,
    ) -> DispatchOutcome {
        let kind = err.kind();
        let message = err.user_message();
        match &err {
            ProviderError::MalformedResponse { payload, .. } => {
                tracing::warn!("{} request failed: {} (payload: {})", mode, err, payload)
            }
            _ => tracing::warn!("{} request failed: {}", mode, err),
        }

        let mut state = self.state.lock();
        if state.generation != generation {
            return DispatchOutcome::Discarded;
        }

        let (turn, artifact) = match placeholder {
            Some(id) => {
                let content = format!(
                    "Sorry, I encountered an error generating the image: {}",
                    message
                );
                let updated = state.transcript.update(id, |turn| {
                    turn.content = content;
                    turn.kind = TurnKind::Error;
                    turn.model_used = Some("System Error".to_string());
                });
                let Some(turn) = updated else {
                    tracing::info!("placeholder {} is gone; dropping {} error", id, mode);
                    return DispatchOutcome::Discarded;
                };
                self.emit(DispatchEvent::TurnUpdated(turn.clone()));
                (
                    turn,
                    Artifact::text(
                        "Image Generation Error",
                        format!("Error generating image: {}", message),
                    ),
                )
            }
            None => {
                let turn = Turn::error(format!("Sorry, I encountered an error: {}", message), mode);
                state.transcript.push(turn.clone());
                self.emit(DispatchEvent::TurnAppended(turn.clone()));
                (
                    turn,
                    Artifact::text("Processing Error", format!("Error: {}", message)),
                )
            }
        };
        drop(state);

        self.emit(DispatchEvent::Artifact(artifact));
        self.emit(DispatchEvent::Notification(Notification::error(
            "Error",
            format!("Failed to get response from AI: {}", message),
        )));
        DispatchOutcome::Failed {
            turn_id: turn.id,
            kind,
        }
    }

    /// Plays speech-mode audio, or synthesizes the reply when auto-speak is on.
    async fn after_success(&self, generation: u64, turn_id: TurnId, mode: Mode, rendered: Rendered) {
        if let Some(audio) = rendered.audio {
            self.play_audio(&audio);
            return;
        }
        if !self.auto_speak || mode == Mode::Speech {
            return;
        }
        let Some(spoken) = rendered.spoken else {
            return;
        };
        let Some(speech) = self.registry.get(Mode::Speech) else {
            return;
        };

        let request = ModeRequest::Speech {
            text: spoken,
            voice_id: None,
        };
        let snapshot = ConversationHistory::new();
        match speech.execute(&request, &snapshot).await {
            Ok(ProviderResult::Speech { audio_data_uri }) if !audio_data_uri.is_empty() => {
                let updated = {
                    let mut state = self.state.lock();
                    if state.generation != generation {
                        return;
                    }
                    state.transcript.set_audio(turn_id, &audio_data_uri)
                };
                if let Some(turn) = updated {
                    self.emit(DispatchEvent::TurnUpdated(turn));
                    self.play_audio(&audio_data_uri);
                }
            }
            Ok(_) => tracing::debug!("speech synthesis skipped for {} turn", mode),
            Err(err) => {
                tracing::warn!("text-to-speech failed: {}", err);
                self.emit(DispatchEvent::Notification(Notification::error(
                    "Text-to-Speech Error",
                    "Could not generate audio for the assistant's response.",
                )));
            }
        }
    }

    /// Starts playback of `data_uri`, stopping anything already playing.
    pub fn play_audio(&self, data_uri: &str) {
        if let Err(err) = self.player.play(data_uri) {
            tracing::warn!("audio playback failed: {}", err);
            let title = match err {
                PlaybackError::Load(_) => "Audio Load Error",
                PlaybackError::Play(_) => "Audio Playback Error",
            };
            self.emit(DispatchEvent::Notification(Notification::error(
                title,
                err.to_string(),
            )));
        }
    }

    pub fn stop_audio(&self) {
        self.player.stop();
    }

    /// Starts a new conversation. Results still in flight are dropped.
    pub fn reset(&self) {
        self.player.stop();
        let mut state = self.state.lock();
        state.generation += 1;
        state.transcript.clear();
        state.history.clear();
        self.emit(DispatchEvent::Cleared);
        if let Some(greeting) = &self.greeting {
            let turn = greeting_turn(greeting);
            state.transcript.push(turn.clone());
            self.emit(DispatchEvent::TurnAppended(turn));
        }
        tracing::info!("conversation reset");
    }

    /// Removes one displayed turn. History is not affected.
    pub fn remove_turn(&self, id: TurnId) -> bool {
        let removed = self.state.lock().transcript.remove(id).is_some();
        if removed {
            self.emit(DispatchEvent::TurnRemoved(id));
        }
        removed
    }

    pub fn transcript(&self) -> Vec<Turn> {
        self.state.lock().transcript.turns().to_vec()
    }

    pub fn history(&self) -> ConversationHistory {
        self.state.lock().history.clone()
    }

    pub fn history_blob(&self) -> String {
        self.state.lock().history.to_blob()
    }

    pub fn is_loading(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn emit(&self, event: DispatchEvent) {
        if let Some(tx) = &self.events {
            // A closed receiver just means nobody is listening anymore
            let _ = tx.send(event);
        }
    }
}

/// Opening assistant turn, tagged with the assistant's own name
fn greeting_turn(greeting: &str) -> Turn {
    let mut turn = Turn::assistant(greeting, Mode::General);
    turn.model_used = Some(GREETING_LABEL.to_string());
    turn
}

fn render(user_text: &str, result: ProviderResult) -> Rendered {
    let title = title_base(user_text);
    match result {
        ProviderResult::Chat { text } => Rendered {
            content: text.clone(),
            summary: text.clone(),
            spoken: Some(text.clone()),
            audio: None,
            artifact: Artifact::text(format!("Chat: {}", title), text),
        },
        ProviderResult::Code {
            code,
            explanation,
            language,
        } => {
            let mut content = format!("```{}\n{}\n```", language, code);
            if let Some(explanation) = &explanation {
                content.push_str(&format!("\n\n**Explanation:**\n{}", explanation));
            }
            let summary = match &explanation {
                Some(explanation) => format!("(Code snippet provided) {}", explanation),
                None => "(Code snippet provided)".to_string(),
            };
            let spoken = explanation
                .clone()
                .unwrap_or_else(|| "Here is the code you requested.".to_string());
            Rendered {
                content,
                summary,
                spoken: Some(spoken),
                audio: None,
                artifact: Artifact {
                    kind: ArtifactKind::Code {
                        language: language.clone(),
                    },
                    title: format!("Code: {} ({})", title, language),
                    content: code,
                },
            }
        }
        ProviderResult::Image {
            image_data_uri,
            prompt_echoed,
        } => Rendered {
            content: format!(
                "![Generated image for prompt: {}]({})",
                prompt_echoed, image_data_uri
            ),
            summary: format!("(Image generated for prompt: \"{}\")", prompt_echoed),
            spoken: Some(format!(
                "An image has been generated for your prompt: \"{}\". It's now visible.",
                prompt_echoed
            )),
            audio: None,
            artifact: Artifact {
                kind: ArtifactKind::Image,
                title: format!("Image: {}", title),
                content: image_data_uri,
            },
        },
        ProviderResult::Speech { audio_data_uri } if audio_data_uri.is_empty() => Rendered {
            content: "Speech synthesis is not configured, so no audio was produced.".to_string(),
            summary: "(Speech synthesis skipped)".to_string(),
            spoken: None,
            audio: None,
            artifact: Artifact::text(format!("Speech: {}", title), user_text),
        },
        ProviderResult::Speech { audio_data_uri } => Rendered {
            content: "Here is the synthesized speech.".to_string(),
            summary: "(Audio generated)".to_string(),
            spoken: None,
            audio: Some(audio_data_uri),
            artifact: Artifact::text(format!("Speech: {}", title), user_text),
        },
    }
}
