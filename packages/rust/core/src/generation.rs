//! Section-by-section content generation.
//!
//! Each outline section is expanded by a [`TextGenerator`]. A failing
//! section is replaced by its deterministic fallback block and generation
//! moves on, so one bad call never costs the rest of the post.
//!
//! The shipped backend is an out-of-process model bridge spoken to over a
//! JSON-lines stdin/stdout protocol:
//!
//! ```text
//! bridge → {"type":"ready","model":"gpt2"}
//! host   → {"type":"generate","id":"req-1","request":{"prompt":…,"max_input_tokens":512,…}}
//! bridge → {"type":"result","id":"req-1","text":"…"}   or   {"type":"error","id":"req-1","error":"…"}
//! host   → {"type":"shutdown"}
//! ```

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

use blogwright_shared::{
    BlockOrigin, BlogwrightError, GeneratedBlock, GeneratedContent, GenerationConfig, Outline,
    Result, Section,
};
use tracing::{debug, info, instrument, warn};

/// How long a bridge gets to exit after `shutdown` before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Non-reply lines tolerated while waiting for one generation reply.
const MAX_STRAY_LINES: usize = 64;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One generation call: prompt plus decoding limits.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Prompt limit in model tokens; the backend truncates beyond it.
    pub max_input_tokens: u32,
    /// Output limit in model tokens.
    pub max_output_tokens: u32,
    /// Size of n-grams that may not repeat in the output.
    pub no_repeat_ngram_size: u32,
}

/// Prompt subject and decoding limits shared by every section.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub prompt_subject: String,
    pub max_input_tokens: u32,
    pub max_output_tokens: u32,
    pub no_repeat_ngram_size: u32,
}

impl From<&GenerationConfig> for GenerationSettings {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            prompt_subject: config.prompt_subject.clone(),
            max_input_tokens: config.max_input_tokens,
            max_output_tokens: config.max_output_tokens,
            no_repeat_ngram_size: config.no_repeat_ngram_size,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

impl GenerationSettings {
    /// Build the request for one section.
    pub fn request_for(&self, section: &Section) -> GenerationRequest {
        GenerationRequest {
            prompt: build_prompt(&self.prompt_subject, section),
            max_input_tokens: self.max_input_tokens,
            max_output_tokens: self.max_output_tokens,
            no_repeat_ngram_size: self.no_repeat_ngram_size,
        }
    }
}

/// Prompt for one section.
pub fn build_prompt(subject: &str, section: &Section) -> String {
    format!(
        "Write a detailed section for a blog post about {subject}. Heading: {}. Content: {}",
        section.heading, section.content
    )
}

/// Block used when generation for `section` fails.
pub fn fallback_block(section: &Section) -> String {
    format!("<h2>{}</h2>\n<p>{}</p>", section.heading, section.content)
}

// ---------------------------------------------------------------------------
// Generator trait
// ---------------------------------------------------------------------------

/// A text-generation backend.
///
/// Implementations hold their model resources for as long as they live; a
/// run borrows the generator mutably, so concurrent runs need their own.
pub trait TextGenerator: Send {
    /// Human-readable backend name for tracing and reports.
    fn name(&self) -> &str;

    /// Produce text for `request`.
    fn generate(&mut self, request: &GenerationRequest) -> Result<String>;

    /// Release backend resources. Further `generate` calls fail.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Backend that always fails, so every section takes its fallback.
#[derive(Debug, Clone)]
pub struct OfflineGenerator {
    reason: String,
}

impl OfflineGenerator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl TextGenerator for OfflineGenerator {
    fn name(&self) -> &str {
        "offline"
    }

    fn generate(&mut self, _request: &GenerationRequest) -> Result<String> {
        Err(BlogwrightError::Generation(self.reason.clone()))
    }
}

/// Pick the configured backend. Never fails: a bridge that cannot start is
/// downgraded to [`OfflineGenerator`].
pub fn open_generator(config: &GenerationConfig) -> Box<dyn TextGenerator> {
    match config.backend.as_str() {
        "bridge" => match BridgeGenerator::spawn(&BridgeConfig::from(config)) {
            Ok(bridge) => Box::new(bridge),
            Err(e) => {
                warn!(error = %e, "model bridge unavailable, every section will use its fallback");
                Box::new(OfflineGenerator::new(format!("model bridge unavailable: {e}")))
            }
        },
        "offline" => Box::new(OfflineGenerator::new("generation disabled by configuration")),
        other => {
            warn!(backend = other, "unknown generation backend, running offline");
            Box::new(OfflineGenerator::new(format!("unknown backend '{other}'")))
        }
    }
}

// ---------------------------------------------------------------------------
// Content generation
// ---------------------------------------------------------------------------

/// Progress callback for section generation.
pub trait GenerationProgress: Send + Sync {
    /// Called after each section, whether it was generated or fell back.
    fn section_done(&self, current: usize, total: usize, heading: &str, fallback: bool);
}

/// No-op generation progress.
pub struct SilentGenerationProgress;

impl GenerationProgress for SilentGenerationProgress {
    fn section_done(&self, _current: usize, _total: usize, _heading: &str, _fallback: bool) {}
}

/// Expand every outline section, in order, into a block.
///
/// Always returns exactly one block per section.
#[instrument(skip_all, fields(generator = generator.name(), sections = outline.sections.len()))]
pub fn generate_content(
    outline: &Outline,
    generator: &mut dyn TextGenerator,
    settings: &GenerationSettings,
    progress: &dyn GenerationProgress,
) -> GeneratedContent {
    let total = outline.sections.len();
    let mut blocks = Vec::with_capacity(total);

    for (i, section) in outline.sections.iter().enumerate() {
        debug!(heading = %section.heading, "generating section");
        let request = settings.request_for(section);

        let block = match generate_checked(generator, &request) {
            Ok(text) => GeneratedBlock {
                heading: section.heading.clone(),
                text,
                origin: BlockOrigin::Model,
            },
            Err(e) => {
                warn!(heading = %section.heading, error = %e, "section generation failed, using fallback");
                GeneratedBlock {
                    heading: section.heading.clone(),
                    text: fallback_block(section),
                    origin: BlockOrigin::Fallback {
                        reason: e.to_string(),
                    },
                }
            }
        };

        progress.section_done(i + 1, total, &section.heading, block.origin.is_fallback());
        blocks.push(block);
    }

    let content = GeneratedContent { blocks };
    info!(
        blocks = content.blocks.len(),
        fallbacks = content.fallback_count(),
        "content generated"
    );
    content
}

/// Call the backend and reject blank output.
fn generate_checked(
    generator: &mut dyn TextGenerator,
    request: &GenerationRequest,
) -> Result<String> {
    let text = generator.generate(request)?;
    if text.trim().is_empty() {
        return Err(BlogwrightError::Generation(
            "backend returned empty text".into(),
        ));
    }
    Ok(text)
}

// ---------------------------------------------------------------------------
// Bridge protocol
// ---------------------------------------------------------------------------

/// Request message sent to the bridge.
#[derive(Debug, serde::Serialize)]
#[serde(tag = "type")]
enum RequestMessage<'a> {
    #[serde(rename = "generate")]
    Generate {
        id: String,
        request: &'a GenerationRequest,
    },
    #[serde(rename = "shutdown")]
    Shutdown,
}

/// Response message received from the bridge.
#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type")]
enum ResponseMessage {
    #[serde(rename = "ready")]
    Ready {
        #[serde(default)]
        model: Option<String>,
    },
    #[serde(rename = "result")]
    Result { id: String, text: String },
    #[serde(rename = "error")]
    Error { id: String, error: String },
}

fn parse_message(line: &str) -> Result<ResponseMessage> {
    serde_json::from_str(line.trim()).map_err(|e| {
        let preview: String = line.chars().take(200).collect();
        BlogwrightError::Generation(format!("invalid bridge message: {e} (got: {preview})"))
    })
}

// ---------------------------------------------------------------------------
// Bridge generator
// ---------------------------------------------------------------------------

/// How to start the model bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Executable (e.g., "python3").
    pub cmd: String,
    /// Arguments (e.g., the bridge script path).
    pub args: Vec<String>,
    /// Model name, passed as `BLOGWRIGHT_MODEL`.
    pub model: String,
}

impl From<&GenerationConfig> for BridgeConfig {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            cmd: config.bridge_cmd.clone(),
            args: config.bridge_args.clone(),
            model: config.model.clone(),
        }
    }
}

/// Model bridge subprocess. Started once, stopped on [`TextGenerator::close`] or drop.
pub struct BridgeGenerator {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    request_counter: u64,
    model: String,
    closed: bool,
}

impl BridgeGenerator {
    /// Spawn the bridge and wait for its ready message.
    pub fn spawn(config: &BridgeConfig) -> Result<Self> {
        info!(cmd = %config.cmd, args = ?config.args, model = %config.model, "spawning model bridge");

        let mut child = Command::new(&config.cmd)
            .args(&config.args)
            .env("BLOGWRIGHT_MODEL", &config.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                BlogwrightError::Generation(format!(
                    "failed to spawn bridge: {e}. Is `{}` installed?",
                    config.cmd
                ))
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            BlogwrightError::Generation("failed to capture bridge stdin".into())
        })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            BlogwrightError::Generation("failed to capture bridge stdout".into())
        })?;

        let mut bridge = Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            request_counter: 0,
            model: config.model.clone(),
            closed: false,
        };

        // Dropping `bridge` on error reaps the child
        bridge.wait_for_ready()?;

        Ok(bridge)
    }

    fn wait_for_ready(&mut self) -> Result<()> {
        match self.read_message()? {
            ResponseMessage::Ready { model } => {
                if let Some(model) = model {
                    self.model = model;
                }
                info!(model = %self.model, "model bridge is ready");
                Ok(())
            }
            other => Err(BlogwrightError::Generation(format!(
                "expected ready message, got: {other:?}"
            ))),
        }
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| BlogwrightError::Generation(format!("bridge read error: {e}")))?;

        if line.is_empty() {
            return Err(BlogwrightError::Generation(
                "bridge closed stdout unexpectedly".into(),
            ));
        }
        Ok(line)
    }

    fn read_message(&mut self) -> Result<ResponseMessage> {
        let line = self.read_line()?;
        parse_message(&line)
    }

    /// Read until the reply for `id` arrives, skipping stray output and stale replies.
    fn read_reply(&mut self, id: &str) -> Result<String> {
        for _ in 0..=MAX_STRAY_LINES {
            let line = self.read_line()?;
            match parse_message(&line) {
                Ok(ResponseMessage::Result { id: got, text }) if got == id => return Ok(text),
                Ok(ResponseMessage::Error { id: got, error }) if got == id => {
                    return Err(BlogwrightError::Generation(error));
                }
                Ok(ResponseMessage::Result { id: got, .. } | ResponseMessage::Error { id: got, .. }) => {
                    warn!(expected = id, got = %got, "skipping stale bridge reply");
                }
                Ok(ResponseMessage::Ready { .. }) => {
                    warn!(expected = id, "skipping unexpected ready message");
                }
                Err(e) => debug!(error = %e, "skipping non-protocol bridge output"),
            }
        }
        Err(BlogwrightError::Generation(format!(
            "no reply to {id} within {MAX_STRAY_LINES} lines of bridge output"
        )))
    }

    fn send(&mut self, msg: &RequestMessage<'_>) -> Result<()> {
        let json = serde_json::to_string(msg).map_err(|e| {
            BlogwrightError::Generation(format!("failed to serialize request: {e}"))
        })?;

        writeln!(self.stdin, "{json}").map_err(|e| {
            BlogwrightError::Generation(format!("failed to write to bridge stdin: {e}"))
        })?;
        self.stdin
            .flush()
            .map_err(|e| BlogwrightError::Generation(format!("failed to flush bridge stdin: {e}")))
    }

    /// Ask the bridge to exit; kill it if it has not gone within the grace period.
    fn stop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let _ = self.send(&RequestMessage::Shutdown);

        let deadline = Instant::now() + SHUTDOWN_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    info!(?status, "model bridge exited");
                    return;
                }
                Ok(None) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(25));
                }
                Ok(None) => {
                    warn!("model bridge did not exit after shutdown, killing it");
                    let _ = self.child.kill();
                    let _ = self.child.wait();
                    return;
                }
                Err(e) => {
                    warn!("bridge wait error: {e}");
                    return;
                }
            }
        }
    }
}

impl TextGenerator for BridgeGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    fn generate(&mut self, request: &GenerationRequest) -> Result<String> {
        if self.closed {
            return Err(BlogwrightError::Generation("model bridge is closed".into()));
        }

        self.request_counter += 1;
        let id = format!("req-{}", self.request_counter);

        self.send(&RequestMessage::Generate {
            id: id.clone(),
            request,
        })?;

        self.read_reply(&id)
    }

    fn close(&mut self) -> Result<()> {
        self.stop();
        Ok(())
    }
}

impl Drop for BridgeGenerator {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scripted backend: fails on the listed headings, echoes the prompt otherwise.
    struct ScriptedGenerator {
        fail_on: Vec<&'static str>,
        blank_on: Vec<&'static str>,
        seen: Vec<GenerationRequest>,
    }

    impl ScriptedGenerator {
        fn new(fail_on: Vec<&'static str>) -> Self {
            Self {
                fail_on,
                blank_on: Vec::new(),
                seen: Vec::new(),
            }
        }
    }

    impl TextGenerator for ScriptedGenerator {
        fn name(&self) -> &str {
            "scripted"
        }

        fn generate(&mut self, request: &GenerationRequest) -> Result<String> {
            self.seen.push(request.clone());
            if self.fail_on.iter().any(|h| request.prompt.contains(&format!("Heading: {h}."))) {
                return Err(BlogwrightError::Generation("CUDA out of memory".into()));
            }
            if self.blank_on.iter().any(|h| request.prompt.contains(&format!("Heading: {h}."))) {
                return Ok("  \n".into());
            }
            Ok(format!("{} Generated prose.", request.prompt))
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        calls: Mutex<Vec<(usize, usize, String, bool)>>,
    }

    impl GenerationProgress for RecordingProgress {
        fn section_done(&self, current: usize, total: usize, heading: &str, fallback: bool) {
            self.calls
                .lock()
                .unwrap()
                .push((current, total, heading.to_string(), fallback));
        }
    }

    fn outline() -> Outline {
        Outline {
            title: "Top Trends in Remote Work for 2023".into(),
            sections: vec![
                Section::new("Introduction", "Brief overview of the topic."),
                Section::new("Trend 1", "Hybrid models."),
                Section::new("Trend 2", "Well-being."),
                Section::new("Conclusion", "Summary and future outlook."),
            ],
        }
    }

    #[test]
    fn prompt_is_deterministic() {
        let section = Section::new("Trend 1", "Hybrid models.");
        assert_eq!(
            build_prompt("HR trends", &section),
            "Write a detailed section for a blog post about HR trends. Heading: Trend 1. Content: Hybrid models."
        );
    }

    #[test]
    fn fallback_block_template() {
        let section = Section::new("Trend 2", "Well-being.");
        assert_eq!(fallback_block(&section), "<h2>Trend 2</h2>\n<p>Well-being.</p>");
    }

    #[test]
    fn requests_carry_limits() {
        let settings = GenerationSettings::default();
        let request = settings.request_for(&Section::new("Intro", "x"));
        assert_eq!(request.max_input_tokens, 512);
        assert_eq!(request.max_output_tokens, 500);
        assert_eq!(request.no_repeat_ngram_size, 2);
        assert!(request.prompt.contains("about HR trends."));
    }

    #[test]
    fn all_sections_generated() {
        let mut generator = ScriptedGenerator::new(vec![]);
        let content = generate_content(
            &outline(),
            &mut generator,
            &GenerationSettings::default(),
            &SilentGenerationProgress,
        );
        assert_eq!(content.blocks.len(), 4);
        assert_eq!(content.fallback_count(), 0);
        assert_eq!(generator.seen.len(), 4);
        assert!(content.blocks[0].text.contains("Heading: Introduction."));
        assert!(content.blocks[3].text.contains("Heading: Conclusion."));
    }

    #[test]
    fn one_failure_only_affects_its_section() {
        let mut generator = ScriptedGenerator::new(vec!["Trend 1"]);
        let progress = RecordingProgress::default();
        let outline = outline();
        let content = generate_content(
            &outline,
            &mut generator,
            &GenerationSettings::default(),
            &progress,
        );

        assert_eq!(content.blocks.len(), outline.sections.len());
        assert_eq!(content.blocks[1].text, fallback_block(&outline.sections[1]));
        assert_eq!(
            content.blocks[1].origin,
            BlockOrigin::Fallback {
                reason: "generation error: CUDA out of memory".into()
            }
        );
        assert_eq!(content.blocks[2].origin, BlockOrigin::Model);

        let headings: Vec<&str> = content.blocks.iter().map(|b| b.heading.as_str()).collect();
        assert_eq!(headings, vec!["Introduction", "Trend 1", "Trend 2", "Conclusion"]);

        let calls = progress.calls.lock().unwrap();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[1], (2, 4, "Trend 1".to_string(), true));
        assert_eq!(calls[3], (4, 4, "Conclusion".to_string(), false));
    }

    #[test]
    fn blank_output_counts_as_failure() {
        let mut generator = ScriptedGenerator::new(vec![]);
        generator.blank_on = vec!["Conclusion"];
        let outline = outline();
        let content = generate_content(
            &outline,
            &mut generator,
            &GenerationSettings::default(),
            &SilentGenerationProgress,
        );
        assert_eq!(content.blocks[3].text, fallback_block(&outline.sections[3]));
        assert!(content.blocks[3].origin.is_fallback());
    }

    #[test]
    fn offline_generator_falls_back_everywhere() {
        let mut generator = OfflineGenerator::new("no model");
        let outline = outline();
        let content = generate_content(
            &outline,
            &mut generator,
            &GenerationSettings::default(),
            &SilentGenerationProgress,
        );
        assert_eq!(content.fallback_count(), 4);
        for (block, section) in content.blocks.iter().zip(&outline.sections) {
            assert_eq!(block.text, fallback_block(section));
        }
    }

    #[test]
    fn empty_outline_yields_no_blocks() {
        let outline = Outline {
            title: "t".into(),
            sections: vec![],
        };
        let content = generate_content(
            &outline,
            &mut OfflineGenerator::new("x"),
            &GenerationSettings::default(),
            &SilentGenerationProgress,
        );
        assert!(content.blocks.is_empty());
    }

    #[test]
    fn offline_backend_from_config() {
        let config = GenerationConfig {
            backend: "offline".into(),
            ..GenerationConfig::default()
        };
        let mut generator = open_generator(&config);
        assert_eq!(generator.name(), "offline");
        let request = GenerationSettings::default().request_for(&Section::new("a", "b"));
        assert!(generator.generate(&request).is_err());
    }

    #[test]
    fn missing_bridge_downgrades_to_offline() {
        let config = GenerationConfig {
            backend: "bridge".into(),
            bridge_cmd: "blogwright-no-such-bridge-binary".into(),
            ..GenerationConfig::default()
        };
        let generator = open_generator(&config);
        assert_eq!(generator.name(), "offline");
    }

    // -----------------------------------------------------------------------
    // Protocol
    // -----------------------------------------------------------------------

    #[test]
    fn generate_message_serializes_correctly() {
        let request = GenerationSettings::default().request_for(&Section::new("Trend 1", "x"));
        let msg = RequestMessage::Generate {
            id: "req-1".into(),
            request: &request,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"generate""#));
        assert!(json.contains(r#""id":"req-1""#));
        assert!(json.contains(r#""max_input_tokens":512"#));
        assert!(json.contains(r#""no_repeat_ngram_size":2"#));
    }

    #[test]
    fn shutdown_message_serializes_correctly() {
        let json = serde_json::to_string(&RequestMessage::Shutdown).unwrap();
        assert_eq!(json, r#"{"type":"shutdown"}"#);
    }

    #[test]
    fn response_messages_deserialize() {
        let msg: ResponseMessage = serde_json::from_str(r#"{"type":"ready"}"#).unwrap();
        assert!(matches!(msg, ResponseMessage::Ready { model: None }));

        let msg: ResponseMessage =
            serde_json::from_str(r#"{"type":"result","id":"req-3","text":"prose"}"#).unwrap();
        match msg {
            ResponseMessage::Result { id, text } => {
                assert_eq!(id, "req-3");
                assert_eq!(text, "prose");
            }
            other => panic!("expected Result, got {other:?}"),
        }

        let msg: ResponseMessage =
            serde_json::from_str(r#"{"type":"error","id":"req-4","error":"timeout"}"#).unwrap();
        assert!(matches!(msg, ResponseMessage::Error { error, .. } if error == "timeout"));
    }

    // -----------------------------------------------------------------------
    // Bridge subprocess (POSIX shell stand-in for the model server)
    // -----------------------------------------------------------------------

    #[cfg(unix)]
    fn shell_bridge(script: &str) -> BridgeConfig {
        BridgeConfig {
            cmd: "sh".into(),
            args: vec!["-c".into(), script.into()],
            model: "stub".into(),
        }
    }

    #[cfg(unix)]
    const ECHO_BRIDGE: &str = r#"
echo '{"type":"ready","model":"stub-gpt"}'
n=0
while read -r line; do
  case "$line" in
    *'"shutdown"'*) exit 0 ;;
  esac
  n=$((n+1))
  echo "{\"type\":\"result\",\"id\":\"req-$n\",\"text\":\"section $n\"}"
done
"#;

    #[cfg(unix)]
    #[test]
    fn bridge_round_trip() {
        let mut bridge = BridgeGenerator::spawn(&shell_bridge(ECHO_BRIDGE)).expect("spawn");
        assert_eq!(bridge.name(), "stub-gpt");

        let content = generate_content(
            &outline(),
            &mut bridge,
            &GenerationSettings::default(),
            &SilentGenerationProgress,
        );
        let texts: Vec<&str> = content.blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["section 1", "section 2", "section 3", "section 4"]);

        bridge.close().expect("close");
        let request = GenerationSettings::default().request_for(&Section::new("a", "b"));
        assert!(bridge.generate(&request).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn bridge_error_response_falls_back() {
        let script = r#"
echo '{"type":"ready"}'
n=0
while read -r line; do
  case "$line" in *'"shutdown"'*) exit 0 ;; esac
  n=$((n+1))
  if [ "$n" -eq 2 ]; then
    echo "{\"type\":\"error\",\"id\":\"req-$n\",\"error\":\"model crashed\"}"
  else
    echo "{\"type\":\"result\",\"id\":\"req-$n\",\"text\":\"section $n\"}"
  fi
done
"#;
        let mut bridge = BridgeGenerator::spawn(&shell_bridge(script)).expect("spawn");
        let outline = outline();
        let content = generate_content(
            &outline,
            &mut bridge,
            &GenerationSettings::default(),
            &SilentGenerationProgress,
        );
        assert_eq!(content.fallback_count(), 1);
        assert_eq!(content.blocks[1].text, fallback_block(&outline.sections[1]));
        assert_eq!(
            content.blocks[1].origin,
            BlockOrigin::Fallback {
                reason: "generation error: model crashed".into()
            }
        );
        assert_eq!(content.blocks[2].text, "section 3");
    }

    #[cfg(unix)]
    #[test]
    fn stray_stdout_line_does_not_desync_later_sections() {
        let script = r#"
echo '{"type":"ready"}'
n=0
while read -r line; do
  case "$line" in *'"shutdown"'*) exit 0 ;; esac
  n=$((n+1))
  if [ "$n" -eq 1 ]; then
    echo 'Setting pad_token_id to eos_token_id:50256 for open-end generation.'
  fi
  echo "{\"type\":\"result\",\"id\":\"req-$n\",\"text\":\"section $n\"}"
done
"#;
        let mut bridge = BridgeGenerator::spawn(&shell_bridge(script)).expect("spawn");
        let content = generate_content(
            &outline(),
            &mut bridge,
            &GenerationSettings::default(),
            &SilentGenerationProgress,
        );
        assert_eq!(content.fallback_count(), 0);
        let texts: Vec<&str> = content.blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["section 1", "section 2", "section 3", "section 4"]);
    }

    #[cfg(unix)]
    #[test]
    fn stale_error_is_not_charged_to_the_current_request() {
        let script = r#"
echo '{"type":"ready"}'
n=0
while read -r line; do
  case "$line" in *'"shutdown"'*) exit 0 ;; esac
  n=$((n+1))
  if [ "$n" -eq 3 ]; then
    echo '{"type":"error","id":"req-1","error":"late failure"}'
  fi
  echo "{\"type\":\"result\",\"id\":\"req-$n\",\"text\":\"section $n\"}"
done
"#;
        let mut bridge = BridgeGenerator::spawn(&shell_bridge(script)).expect("spawn");
        let content = generate_content(
            &outline(),
            &mut bridge,
            &GenerationSettings::default(),
            &SilentGenerationProgress,
        );
        assert_eq!(content.fallback_count(), 0);
        assert_eq!(content.blocks[2].text, "section 3");
    }

    #[cfg(unix)]
    #[test]
    fn endless_noise_gives_up_on_that_request() {
        let script = r#"
echo '{"type":"ready"}'
while read -r line; do
  case "$line" in *'"shutdown"'*) exit 0 ;; esac
  i=0
  while [ "$i" -lt 100 ]; do echo "noise $i"; i=$((i+1)); done
done
"#;
        let mut bridge = BridgeGenerator::spawn(&shell_bridge(script)).expect("spawn");
        let request = GenerationSettings::default().request_for(&Section::new("a", "b"));
        let err = bridge.generate(&request).unwrap_err();
        assert!(err.to_string().contains("no reply to req-1"));
    }

    #[cfg(unix)]
    #[test]
    fn bridge_that_exits_before_ready_fails_to_spawn() {
        let result = BridgeGenerator::spawn(&shell_bridge("exit 0"));
        let err = result.err().expect("spawn should fail");
        assert!(err.to_string().contains("closed stdout"));
    }

    #[cfg(unix)]
    #[test]
    fn bridge_garbage_ready_fails_to_spawn() {
        let result = BridgeGenerator::spawn(&shell_bridge("echo 'loading weights...'; sleep 5"));
        let err = result.err().expect("spawn should fail");
        assert!(err.to_string().contains("invalid bridge message"));
    }
}
