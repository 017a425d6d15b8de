use crate::error::App;
use crate::player::media::{MediaElement, MediaEvent};
use futures_util::stream::StreamExt;
use glib::object::ObjectExt;
use gstreamer::prelude::*;
use gstreamer::{ClockTime, MessageView, Pipeline, SeekFlags};
use log::{error, info};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task;

/// `MediaElement` over an http source feeding decodebin into the default audio sink.
pub struct GstMedia {
    pipeline: Pipeline,
    paused: bool,
    source: Arc<AtomicU64>,
}

impl GstMedia {
    pub fn new(event_sender: mpsc::Sender<MediaEvent>) -> Result<Self, App> {
        gstreamer::init().map_err(|e| App::Init(e.to_string()))?;
        let pipeline = gstreamer::Pipeline::new();
        let source = Arc::new(AtomicU64::new(0));
        listen_to_bus(&pipeline, Arc::clone(&source), event_sender)?;
        info!("GStreamer created successfully.");
        Ok(Self {
            pipeline,
            paused: true,
            source,
        })
    }

    fn reset(&self) -> Result<(), App> {
        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|_| App::State("Failed to set pipeline to Null".to_string()))?;

        for element in self.pipeline.children() {
            self.pipeline
                .remove(&element)
                .map_err(|_| App::Element("Failed to remove element from pipeline".to_string()))?;
        }

        self.pipeline
            .set_state(gstreamer::State::Ready)
            .map_err(|_| App::State("Failed to set pipeline to Ready".to_string()))?;
        Ok(())
    }
}

impl Drop for GstMedia {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gstreamer::State::Null);
    }
}

impl MediaElement for GstMedia {
    fn set_source(&mut self, url: &str) -> Result<(), App> {
        self.source.fetch_add(1, Ordering::SeqCst);
        self.reset()?;
        attach_http_source(&self.pipeline, url)?;
        self.pipeline
            .set_state(gstreamer::State::Paused)
            .map_err(|_| App::State("Failed to set pipeline to Paused".to_string()))?;
        self.paused = true;
        Ok(())
    }

    fn source_id(&self) -> u64 {
        self.source.load(Ordering::SeqCst)
    }

    fn play(&mut self) -> Result<(), App> {
        self.pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|_| App::State("Failed to set pipeline to Playing".to_string()))?;
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), App> {
        self.pipeline
            .set_state(gstreamer::State::Paused)
            .map_err(|_| App::State("Failed to set pipeline to Paused".to_string()))?;
        self.paused = true;
        Ok(())
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn current_time(&self) -> f64 {
        self.pipeline
            .query_position::<ClockTime>()
            .map_or(0.0, clock_to_seconds)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn set_current_time(&mut self, seconds: f64) -> Result<(), App> {
        let position = ClockTime::from_nseconds((seconds.max(0.0) * 1e9) as u64);
        self.pipeline
            .seek_simple(SeekFlags::FLUSH | SeekFlags::KEY_UNIT, position)
            .map_err(|_| App::Pipeline(format!("Failed to seek to {seconds:.2}s")))
    }

    fn duration(&self) -> f64 {
        self.pipeline
            .query_duration::<ClockTime>()
            .map_or(f64::NAN, clock_to_seconds)
    }
}

#[allow(clippy::cast_precision_loss)]
fn clock_to_seconds(time: ClockTime) -> f64 {
    time.nseconds() as f64 / 1e9
}

// EOS is stamped with the source that was loaded when the bus delivered it.
fn listen_to_bus(
    pipeline: &Pipeline,
    source: Arc<AtomicU64>,
    event_sender: mpsc::Sender<MediaEvent>,
) -> Result<(), App> {
    let bus = pipeline
        .bus()
        .ok_or_else(|| App::Pipeline("Failed to get GStreamer bus".to_string()))?;

    task::spawn(bus.stream().for_each(move |msg| {
        let event_sender = event_sender.clone();
        let source = source.load(Ordering::SeqCst);
        async move {
            match msg.view() {
                MessageView::Eos(_) => {
                    info!("EOS message received for source {source}, sending signal.");
                    if event_sender.send(MediaEvent::Ended { source }).await.is_err() {
                        error!("Failed to send EOS signal");
                    }
                }
                MessageView::Error(err) => {
                    error!("Error from GStreamer pipeline: {}", err.error());
                }
                _ => (),
            }
        }
    }));
    Ok(())
}

fn attach_http_source(pipeline: &Pipeline, url: &str) -> Result<(), App> {
    let source = gstreamer::ElementFactory::make("souphttpsrc")
        .property("location", url)
        .build()
        .map_err(|_| App::Element("Failed to create souphttpsrc element".to_string()))?;

    let decodebin = gstreamer::ElementFactory::make("decodebin")
        .build()
        .map_err(|_| App::Element("Failed to create decodebin element".to_string()))?;

    pipeline
        .add_many([&source, &decodebin])
        .map_err(|_| App::Pipeline("Failed to add elements to pipeline".to_string()))?;
    source
        .link(&decodebin)
        .map_err(|_| App::Link("Failed to link source to decodebin".to_string()))?;

    let pipeline_weak = pipeline.downgrade();
    decodebin.connect_pad_added(move |_, src_pad| {
        let Some(pipeline) = pipeline_weak.upgrade() else {
            error!("Failed to upgrade pipeline reference");
            return;
        };
        match link_audio_output(&pipeline, src_pad) {
            Ok(()) => info!("Pipeline elements linked successfully"),
            Err(e) => error!("Failed to link decoded pad: {e}"),
        }
    });

    Ok(())
}

fn link_audio_output(pipeline: &Pipeline, src_pad: &gstreamer::Pad) -> Result<(), App> {
    let make = |name: &str| {
        gstreamer::ElementFactory::make(name)
            .build()
            .map_err(|_| App::Element(format!("Failed to create {name} element")))
    };
    let audioconvert = make("audioconvert")?;
    let audioresample = make("audioresample")?;
    let autoaudiosink = make("autoaudiosink")?;

    pipeline
        .add_many([&audioconvert, &audioresample, &autoaudiosink])
        .map_err(|_| App::Pipeline("Failed to add output elements to pipeline".to_string()))?;
    gstreamer::Element::link_many([&audioconvert, &audioresample, &autoaudiosink])
        .map_err(|_| App::Link("Failed to link audio output chain".to_string()))?;

    for element in [&audioconvert, &audioresample, &autoaudiosink] {
        element.sync_state_with_parent()?;
    }

    let audio_pad = audioconvert
        .static_pad("sink")
        .ok_or_else(|| App::Link("audioconvert has no sink pad".to_string()))?;
    src_pad
        .link(&audio_pad)
        .map_err(|e| App::Link(format!("Failed to link pads: {e:?}")))?;
    Ok(())
}
