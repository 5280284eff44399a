use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use saavy_net::{
    graph::{GraphItem, Network, NetworkState, Routing},
    io::{AudioBuffer, NullBackend},
    module::{AttributeValue, ChannelLayout, Gain, Module, Panner, ProcessCtx},
    ControlMessage, NetworkConfig, NetworkError, SendError, StreamSpec, MAX_CYCLE_SIZE,
};

// ---- test modules ------------------------------------------------------

/// Writes a constant on every output channel.
struct Constant {
    id: String,
    value: f32,
    outputs: Option<usize>,
    stopped: Arc<AtomicBool>,
    largest_pass: Arc<AtomicUsize>,
}

impl Constant {
    fn new(id: &str, value: f32) -> Self {
        Self {
            id: id.to_owned(),
            value,
            outputs: None,
            stopped: Arc::new(AtomicBool::new(false)),
            largest_pass: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_outputs(mut self, outputs: usize) -> Self {
        self.outputs = Some(outputs);
        self
    }
}

impl Module for Constant {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn prepare(&mut self, layout: &mut ChannelLayout, _spec: &StreamSpec) -> bool {
        layout.inputs = 0;
        if let Some(outputs) = self.outputs {
            layout.outputs = outputs;
        }
        true
    }

    fn process(&mut self, _input: &AudioBuffer, output: &mut AudioBuffer, frames: usize, _ctx: &ProcessCtx) {
        self.largest_pass.fetch_max(frames, Ordering::Relaxed);
        for channel in output.channels_mut() {
            channel[..frames].fill(self.value);
        }
    }

    fn event_process(&mut self, command: &str, data: &mut ControlMessage) {
        if command == "setvalue" {
            if let Some(value) = data.try_read_f32() {
                self.value = value;
            }
        }
    }

    fn stop(&mut self) -> bool {
        self.stopped.store(true, Ordering::Release);
        true
    }
}

/// Records `(sender, sequence)` pairs from `seq` messages.
struct Recorder {
    id: String,
    log: Arc<Mutex<Vec<(i32, i32)>>>,
}

impl Module for Recorder {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn prepare(&mut self, _layout: &mut ChannelLayout, _spec: &StreamSpec) -> bool {
        true
    }

    fn process(&mut self, _input: &AudioBuffer, _output: &mut AudioBuffer, _frames: usize, _ctx: &ProcessCtx) {}

    fn event_process(&mut self, command: &str, data: &mut ControlMessage) {
        if command == "seq" {
            let sender = data.read_i32();
            let seq = data.read_i32();
            self.log.lock().push((sender, seq));
        }
    }
}

/// Never prepares.
struct Unpreparable {
    stopped: Arc<AtomicBool>,
}

impl Module for Unpreparable {
    fn id(&self) -> &str {
        "broken"
    }

    fn set_id(&mut self, _id: String) {}

    fn prepare(&mut self, _layout: &mut ChannelLayout, _spec: &StreamSpec) -> bool {
        false
    }

    fn process(&mut self, _input: &AudioBuffer, _output: &mut AudioBuffer, _frames: usize, _ctx: &ProcessCtx) {}

    fn stop(&mut self) -> bool {
        self.stopped.store(true, Ordering::Release);
        true
    }
}

/// Panics in every process call.
struct Panicky;

impl Module for Panicky {
    fn id(&self) -> &str {
        "panicky"
    }

    fn set_id(&mut self, _id: String) {}

    fn prepare(&mut self, _layout: &mut ChannelLayout, _spec: &StreamSpec) -> bool {
        true
    }

    fn process(&mut self, _input: &AudioBuffer, output: &mut AudioBuffer, _frames: usize, _ctx: &ProcessCtx) {
        output.fill(100.0);
        panic!("process failed");
    }
}

// ---- helpers -----------------------------------------------------------

fn network(inputs: usize, outputs: usize) -> Network {
    Network::new(
        NetworkConfig::new()
            .input_channels(inputs)
            .output_channels(outputs),
    )
}

fn render(network: &mut Network, input: Option<&AudioBuffer>, frames: usize) -> AudioBuffer {
    let mut output = AudioBuffer::new(network.spec().output_channels, frames);
    network.process(input, &mut output, frames, 0.0);
    output
}

fn all(samples: &[f32], value: f32) -> bool {
    samples.iter().all(|&s| s == value)
}

// ---- scenarios ---------------------------------------------------------

#[test]
fn gain_follows_setgain() {
    let mut network = network(1, 1);
    network
        .add_item(None, GraphItem::new(Gain::new("g", 1.0)).with_routing(Routing::Channel(0)))
        .unwrap();
    network.start().unwrap();

    let mut input = AudioBuffer::new(1, 64);
    input.fill(0.5);

    let out = render(&mut network, Some(&input), 64);
    assert!(all(out.channel(0), 0.5));

    network
        .send(ControlMessage::new("g/setgain").with_f32(0.5))
        .unwrap();
    let out = render(&mut network, Some(&input), 64);
    assert!(all(out.channel(0), 0.25));
}

#[test]
fn messages_arrive_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut network = network(0, 2);
    network
        .add_module(Recorder {
            id: "rec".into(),
            log: Arc::clone(&log),
        })
        .unwrap();
    network.start().unwrap();

    for seq in 0..100 {
        network
            .send(ControlMessage::new("rec/seq").with_i32(0).with_i32(seq))
            .unwrap();
    }
    render(&mut network, None, 32);

    let seqs: Vec<i32> = log.lock().iter().map(|&(_, seq)| seq).collect();
    assert_eq!(seqs, (0..100).collect::<Vec<_>>());
}

#[test]
fn concurrent_senders_keep_their_own_order() {
    const THREADS: i32 = 4;
    const PER_THREAD: i32 = 250;

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut network = Network::new(NetworkConfig::new().queue_capacity(1024));
    network
        .add_module(Recorder {
            id: "rec".into(),
            log: Arc::clone(&log),
        })
        .unwrap();
    network.start().unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|sender_id| {
            let sender = network.sender();
            thread::spawn(move || {
                for seq in 0..PER_THREAD {
                    let mut msg = ControlMessage::new("rec/seq").with_i32(sender_id).with_i32(seq);
                    // Retry while the renderer catches up
                    loop {
                        match sender.send(msg) {
                            Ok(()) => break,
                            Err(SendError::Full(back)) => {
                                msg = back;
                                thread::yield_now();
                            }
                            Err(SendError::Disconnected(_)) => panic!("network vanished"),
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    render(&mut network, None, 16);

    let log = log.lock();
    assert_eq!(log.len(), (THREADS * PER_THREAD) as usize);
    for sender_id in 0..THREADS {
        let seqs: Vec<i32> = log
            .iter()
            .filter(|&&(s, _)| s == sender_id)
            .map(|&(_, seq)| seq)
            .collect();
        assert_eq!(seqs, (0..PER_THREAD).collect::<Vec<_>>());
    }
}

#[test]
fn message_after_remove_finds_nothing() {
    let constant = Constant::new("c", 1.0);
    let stopped = Arc::clone(&constant.stopped);

    let mut network = network(0, 2);
    network.add_module(constant).unwrap();
    network.start().unwrap();
    assert!(all(render(&mut network, None, 16).channel(0), 1.0));

    network.remove_item("c").unwrap();
    network
        .send(ControlMessage::new("c/setvalue").with_f32(0.5))
        .unwrap();
    let out = render(&mut network, None, 16);
    assert!(out.channels().all(|ch| all(ch, 0.0)));

    // Not stopped until the control side collects it
    assert!(!stopped.load(Ordering::Acquire));
    assert!(network.collect() >= 2);
    assert!(stopped.load(Ordering::Acquire));
}

#[test]
fn siblings_mix_additively() {
    let mut network = network(0, 2);
    network
        .add_item(None, GraphItem::new(Constant::new("a", 0.25)).with_routing(Routing::Channel(0)))
        .unwrap();
    network
        .add_item(None, GraphItem::new(Constant::new("b", 0.5)).with_routing(Routing::Channel(0)))
        .unwrap();
    network.start().unwrap();

    let out = render(&mut network, None, 64);
    assert!(all(out.channel(0), 0.75));
    assert!(all(out.channel(1), 0.0));
}

#[test]
fn wide_module_is_clamped_to_output() {
    let mut network = network(0, 2);
    network
        .add_module(Constant::new("wide", 1.0).with_outputs(4))
        .unwrap();
    network.start().unwrap();

    let out = render(&mut network, None, 64);
    assert_eq!(out.num_channels(), 2);
    assert!(out.channels().all(|ch| all(ch, 1.0)));
}

#[test]
fn pinned_item_lands_on_its_channel() {
    let mut network = network(0, 4);
    network
        .add_item(None, GraphItem::new(Constant::new("c", 1.0)).with_routing(Routing::Channel(2)))
        .unwrap();
    network.start().unwrap();

    let out = render(&mut network, None, 8);
    assert!(all(out.channel(2), 1.0));
    for ch in [0, 1, 3] {
        assert!(all(out.channel(ch), 0.0));
    }

    network.sender().route_item("c", Routing::Channel(3)).unwrap();
    let out = render(&mut network, None, 8);
    assert!(all(out.channel(2), 0.0));
    assert!(all(out.channel(3), 1.0));
}

#[test]
fn nested_items_are_addressed_by_path() {
    let mut network = network(0, 2);
    let tree = GraphItem::new(Panner::new("pan", -1.0))
        .with_child(GraphItem::new(Constant::new("src", 1.0)));
    network.add_item(None, tree).unwrap();
    network.start().unwrap();

    let out = render(&mut network, None, 16);
    assert!(out.channel(0).iter().all(|&s| (s - 1.0).abs() < 1e-6));
    assert!(out.channel(1).iter().all(|&s| s.abs() < 1e-6));

    network
        .send(ControlMessage::new("pan/src/setvalue").with_f32(0.5))
        .unwrap();
    network
        .add_item(Some("pan"), GraphItem::new(Constant::new("extra", 0.25)))
        .unwrap();
    let out = render(&mut network, None, 16);
    assert!(out.channel(0).iter().all(|&s| (s - 0.75).abs() < 1e-6));

    assert_eq!(
        network.item_paths().unwrap(),
        ["pan/src", "pan/extra", "pan"]
    );
    assert_eq!(
        network.attribute("pan", "position").unwrap(),
        Some(AttributeValue::Float(-1.0))
    );
}

#[test]
fn bare_command_reaches_every_module() {
    let mut network = network(1, 1);
    let tree = GraphItem::new(Gain::new("outer", 1.0))
        .with_child(GraphItem::new(Gain::new("inner", 1.0)));
    network.add_item(None, tree).unwrap();
    network.add_module(Gain::new("other", 1.0)).unwrap();
    network.start().unwrap();

    network
        .send(ControlMessage::new("setgain").with_f32(0.5))
        .unwrap();
    render(&mut network, None, 8);

    for path in ["outer", "outer/inner", "other"] {
        assert_eq!(
            network.attribute(path, "gain").unwrap(),
            Some(AttributeValue::Float(0.5)),
            "{path}"
        );
    }
}

#[test]
fn clear_removes_everything() {
    let a = Constant::new("a", 1.0);
    let b = Constant::new("b", 1.0);
    let flags = [Arc::clone(&a.stopped), Arc::clone(&b.stopped)];

    let mut network = network(0, 2);
    network.add_module(a).unwrap();
    network.add_module(b).unwrap();
    network.start().unwrap();
    render(&mut network, None, 8);

    network.sender().clear().unwrap();
    let out = render(&mut network, None, 8);
    assert!(out.channels().all(|ch| all(ch, 0.0)));
    assert!(network.item_paths().unwrap().is_empty());

    network.collect();
    assert!(flags.iter().all(|f| f.load(Ordering::Acquire)));
}

#[test]
fn failed_prepare_is_reported_and_stopped() {
    let stopped = Arc::new(AtomicBool::new(false));
    let network = network(0, 2);

    let result = network.add_module(Unpreparable {
        stopped: Arc::clone(&stopped),
    });

    assert_eq!(
        result,
        Err(NetworkError::PrepareFailed {
            id: "broken".into()
        })
    );
    assert!(stopped.load(Ordering::Acquire));
}

#[test]
fn invalid_ids_are_rejected() {
    let network = network(0, 2);
    assert_eq!(
        network.add_module(Gain::new("a/b", 1.0)),
        Err(NetworkError::InvalidId("a/b".into()))
    );
    assert!(network.add_module(Gain::new("", 1.0)).is_err());
}

#[test]
fn panicking_module_does_not_take_down_the_rest() {
    let mut network = network(0, 2);
    network.add_module(Panicky).unwrap();
    network.add_module(Constant::new("ok", 0.5)).unwrap();
    network.start().unwrap();

    for _ in 0..3 {
        let out = render(&mut network, None, 32);
        assert!(out.channels().all(|ch| all(ch, 0.5)));
    }
    // One fault report despite three failures
    assert_eq!(network.collect(), 3);
}

#[test]
fn long_callbacks_are_split() {
    let constant = Constant::new("c", 1.0);
    let largest = Arc::clone(&constant.largest_pass);

    let mut network = network(0, 2);
    network.add_module(constant).unwrap();
    network.start().unwrap();

    let frames = MAX_CYCLE_SIZE * 3 + 17;
    let out = render(&mut network, None, frames);

    assert!(out.channels().all(|ch| all(ch, 1.0)));
    assert_eq!(largest.load(Ordering::Relaxed), MAX_CYCLE_SIZE);
}

#[test]
fn nothing_renders_before_start() {
    let mut network = network(0, 2);
    network.add_module(Constant::new("c", 1.0)).unwrap();

    let mut output = AudioBuffer::new(2, 16);
    output.fill(9.0);
    network.process(None, &mut output, 16, 0.0);
    assert!(output.channels().all(|ch| all(ch, 0.0)));

    network.start().unwrap();
    assert!(all(render(&mut network, None, 16).channel(0), 1.0));
}

#[test]
fn lifecycle_is_idempotent_and_terminal() {
    let constant = Constant::new("c", 1.0);
    let stopped = Arc::clone(&constant.stopped);

    let mut network = network(0, 2);
    let sender = network.sender();
    network.add_module(constant).unwrap();

    network.start().unwrap();
    network.start().unwrap();
    assert_eq!(network.state(), NetworkState::Started);
    render(&mut network, None, 8);

    network.stop();
    network.stop();
    assert_eq!(network.state(), NetworkState::Stopped);
    assert!(stopped.load(Ordering::Acquire));

    assert_eq!(network.start(), Err(NetworkError::Stopped));
    assert!(!sender.is_connected());
    assert!(matches!(
        sender.send(ControlMessage::new("c/setvalue")),
        Err(SendError::Disconnected(_))
    ));
}

#[test]
fn queued_items_are_stopped_on_teardown() {
    let constant = Constant::new("c", 1.0);
    let stopped = Arc::clone(&constant.stopped);

    let mut network = network(0, 2);
    network.add_module(constant).unwrap();
    drop(network);

    assert!(stopped.load(Ordering::Acquire));
}

#[test]
fn full_queue_rejects_the_newest() {
    let network = Network::new(NetworkConfig::new().queue_capacity(2));
    network.send(ControlMessage::new("a")).unwrap();
    network.send(ControlMessage::new("b")).unwrap();

    match network.send(ControlMessage::new("c")) {
        Err(SendError::Full(msg)) => assert_eq!(msg.address(), "c"),
        other => panic!("expected a full queue, got {other:?}"),
    }
    assert_eq!(
        network.add_module(Gain::new("g", 1.0)),
        Err(NetworkError::QueueFull)
    );
}

#[test]
fn slow_collect_holds_commands_back_instead_of_losing_them() {
    let constant = Constant::new("m", 1.0);
    let stopped = Arc::clone(&constant.stopped);

    // Report ring of 8
    let mut network = Network::new(NetworkConfig::new().queue_capacity(4).max_items(4));
    network.add_module(constant).unwrap();
    network.start().unwrap();

    let mut sent = 0;
    for _ in 0..6 {
        for _ in 0..3 {
            if network.send(ControlMessage::new("m/noop")).is_ok() {
                sent += 1;
            }
        }
        render(&mut network, None, 64);
    }
    // Once the report ring filled up the queue stopped moving
    assert!(sent < 18);

    let mut handed_back = network.collect();
    render(&mut network, None, 64);
    network.remove_item("m").unwrap();
    render(&mut network, None, 64);
    handed_back += network.collect();

    assert!(stopped.load(Ordering::Acquire));
    assert_eq!(network.item_paths(), Ok(Vec::new()));
    // The add, every accepted message, then the removed item and its command
    assert_eq!(handed_back, 1 + sent + 2);
}

#[test]
fn tap_mirrors_first_channel() {
    let mut network = network(0, 2);
    let mut tap = network.attach_tap(256).unwrap();
    network.add_module(Constant::new("c", 0.5)).unwrap();
    network.start().unwrap();

    render(&mut network, None, 64);

    let mut samples = Vec::new();
    while let Ok(sample) = tap.pop() {
        samples.push(sample);
    }
    assert_eq!(samples.len(), 64);
    assert!(all(&samples, 0.5));
}

#[test]
fn null_backend_drives_the_renderer() {
    let constant = Constant::new("c", 1.0);
    let stopped = Arc::clone(&constant.stopped);

    let mut network = network(0, 2);
    network.add_module(constant).unwrap();

    let backend = NullBackend::new(64).unpaced();
    let callbacks = backend.callback_counter();
    network.start_with(backend).unwrap();
    assert_eq!(network.state(), NetworkState::Started);

    // The renderer lives on the backend thread now
    assert_eq!(network.item_paths(), Err(NetworkError::NotAttached));

    let deadline = Instant::now() + Duration::from_secs(5);
    while callbacks.load(Ordering::Acquire) < 10 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert!(callbacks.load(Ordering::Acquire) >= 10);

    network
        .send(ControlMessage::new("c/setvalue").with_f32(0.5))
        .unwrap();

    network.stop();
    assert!(stopped.load(Ordering::Acquire));
}
