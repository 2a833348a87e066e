// Media engine backed by ffmpeg-next
// Requires FFmpeg libraries: libavcodec, libavformat, libavutil
//
// To install FFmpeg development libraries:
// - Ubuntu/Debian: sudo apt install libavcodec-dev libavformat-dev libavutil-dev libavdevice-dev
// - Fedora: sudo dnf install ffmpeg-devel
// - macOS: brew install ffmpeg
// - Windows: Download from https://ffmpeg.org and set FFMPEG_DIR environment variable
//
// Frames are decoded and dropped; presenting them is up to the embedding UI.
// Audio is not decoded, so the volume is only recorded for the embedding UI.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

extern crate ffmpeg_next as ffmpeg;
use ffmpeg::media::Type;
use ffmpeg::util::frame::video::Video as VideoFrame;
use log::debug;

use super::engine::{EngineEvent, MediaEngine, SourceVariant};

/// Commands sent to the decode thread
enum EngineCommand {
    Stop,
    Pause,
    Resume,
}

/// Source waiting for `prepare`
struct BoundSource {
    variant: SourceVariant,
    address: String,
}

pub struct FfmpegEngine {
    user_agent: String,
    bound: Option<BoundSource>,
    command_sender: Option<Sender<EngineCommand>>,
    event_receiver: Option<Receiver<EngineEvent>>,
    playing: Arc<AtomicBool>,
    play_requested: bool,
    volume: f32,
}

impl FfmpegEngine {
    pub fn new(user_agent: &str) -> Self {
        // Initialize FFmpeg
        ffmpeg::init().ok();

        Self {
            user_agent: user_agent.to_string(),
            bound: None,
            command_sender: None,
            event_receiver: None,
            playing: Arc::new(AtomicBool::new(false)),
            play_requested: false,
            volume: 1.0,
        }
    }

    /// Last volume passed to `set_volume`
    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn send(&self, command: EngineCommand) {
        if let Some(ref sender) = self.command_sender {
            let _ = sender.send(command);
        }
    }

    fn decode_thread(
        source: BoundSource,
        user_agent: String,
        start_playing: bool,
        playing: Arc<AtomicBool>,
        cmd_rx: Receiver<EngineCommand>,
        event_tx: Sender<EngineEvent>,
    ) {
        let _ = event_tx.send(EngineEvent::Buffering);

        // Set options for network streams
        let mut options = ffmpeg::Dictionary::new();
        options.set("user_agent", &user_agent);
        options.set("timeout", "5000000"); // 5 second timeout
        match source.variant {
            SourceVariant::Adaptive => {
                options.set("http_persistent", "1");
                options.set("live_start_index", "-1");
            }
            SourceVariant::Progressive => {
                options.set("reconnect", "1");
                options.set("reconnect_streamed", "1");
                options.set("reconnect_delay_max", "5");
            }
        }

        // Open input
        let mut ictx = match ffmpeg::format::input_with_dictionary(&source.address, options) {
            Ok(ctx) => ctx,
            Err(e) => {
                let _ = event_tx.send(EngineEvent::Error(format!("Failed to open stream: {}", e)));
                return;
            }
        };

        // Find video stream
        let video_stream_index = match ictx.streams().best(Type::Video) {
            Some(stream) => stream.index(),
            None => {
                let _ = event_tx.send(EngineEvent::Error("No video stream found".to_string()));
                return;
            }
        };

        let decoder = ictx
            .stream(video_stream_index)
            .ok_or(ffmpeg::Error::StreamNotFound)
            .and_then(|stream| ffmpeg::codec::context::Context::from_parameters(stream.parameters()))
            .and_then(|context| context.decoder().video());

        let mut decoder = match decoder {
            Ok(d) => d,
            Err(e) => {
                let _ = event_tx.send(EngineEvent::Error(format!("Failed to create decoder: {}", e)));
                return;
            }
        };

        let mut paused = !start_playing;
        playing.store(start_playing, Ordering::SeqCst);
        let _ = event_tx.send(EngineEvent::Ready);

        // Packet processing loop
        for (stream, packet) in ictx.packets() {
            // Check for commands
            loop {
                match cmd_rx.try_recv() {
                    Ok(EngineCommand::Stop) | Err(TryRecvError::Disconnected) => {
                        playing.store(false, Ordering::SeqCst);
                        return;
                    }
                    Ok(EngineCommand::Pause) => {
                        paused = true;
                        playing.store(false, Ordering::SeqCst);
                    }
                    Ok(EngineCommand::Resume) => {
                        paused = false;
                        playing.store(true, Ordering::SeqCst);
                    }
                    Err(TryRecvError::Empty) => break,
                }
            }

            // Hold the stream while paused
            while paused {
                match cmd_rx.recv_timeout(Duration::from_millis(50)) {
                    Ok(EngineCommand::Resume) => {
                        paused = false;
                        playing.store(true, Ordering::SeqCst);
                    }
                    Ok(EngineCommand::Stop) | Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                        return;
                    }
                    _ => {}
                }
            }

            // Only process video packets
            if stream.index() != video_stream_index {
                continue;
            }

            if decoder.send_packet(&packet).is_err() {
                continue;
            }

            let mut decoded = VideoFrame::empty();
            while decoder.receive_frame(&mut decoded).is_ok() {
                debug!("Decoded frame pts={:?}", decoded.pts());
            }
        }

        playing.store(false, Ordering::SeqCst);
        let _ = event_tx.send(EngineEvent::Ended);
    }
}

impl MediaEngine for FfmpegEngine {
    fn bind(&mut self, variant: SourceVariant, address: &str) {
        self.stop();
        self.bound = Some(BoundSource {
            variant,
            address: address.to_string(),
        });
    }

    fn prepare(&mut self) {
        let Some(source) = self.bound.take() else {
            return;
        };

        let (cmd_tx, cmd_rx) = channel();
        let (event_tx, event_rx) = channel();

        self.command_sender = Some(cmd_tx);
        self.event_receiver = Some(event_rx);
        self.play_requested = false;

        // Each worker gets its own flag; a detached worker from an earlier
        // source must not write into the current one.
        self.playing = Arc::new(AtomicBool::new(false));
        let user_agent = self.user_agent.clone();
        let playing = Arc::clone(&self.playing);

        // Actual playback begins after `play()`; the worker starts paused.
        thread::spawn(move || {
            Self::decode_thread(source, user_agent, false, playing, cmd_rx, event_tx);
        });
    }

    fn play(&mut self) {
        self.play_requested = true;
        self.send(EngineCommand::Resume);
    }

    fn pause(&mut self) {
        self.play_requested = false;
        self.send(EngineCommand::Pause);
    }

    fn stop(&mut self) {
        self.send(EngineCommand::Stop);
        self.command_sender = None;
        self.event_receiver = None;
        self.bound = None;
        self.play_requested = false;
        self.playing.store(false, Ordering::SeqCst);
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst) || (self.play_requested && self.command_sender.is_some())
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        if let Some(ref receiver) = self.event_receiver {
            loop {
                match receiver.try_recv() {
                    Ok(event) => {
                        if event.is_terminal() {
                            self.play_requested = false;
                        }
                        events.push(event);
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.event_receiver = None;
                        break;
                    }
                }
            }
        }
        events
    }
}

impl Drop for FfmpegEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
