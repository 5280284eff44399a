use rtrb::{Consumer, Producer};
use tracing::{debug, warn};

use crate::{
    config::StreamSpec,
    graph::{
        command::{Command, Outcome, Report},
        item::{GraphItem, Pass, Routing},
    },
    io::AudioBuffer,
    message::{Address, ControlMessage, PATH_SEPARATOR},
    module::{AttributeValue, ProcessCtx},
};

/// Container commands handled by the renderer itself when sent without a
/// path.
const CMD_REMOVE: &str = "remove";
const CMD_ROUTE: &str = "route";
const CMD_CLEAR: &str = "clear";

/// The render side of a network.
///
/// Owns the live item tree and the consumer end of the control queue. Every
/// call to [`Renderer::process`] (or [`Renderer::process_interleaved`]) first
/// applies the commands that were queued when it started, then renders.
///
/// Nothing in the render path allocates or frees: commands and removed items
/// are handed back through the report ring. A command is only taken off the
/// queue once the ring has room for everything it will hand back, so a
/// control side that falls behind on [`Network::collect`] stalls the queue
/// instead of losing reports. Dropping the renderer stops every module it
/// still owns.
///
/// [`Network::collect`]: crate::graph::Network::collect
pub struct Renderer {
    items: Vec<GraphItem>,
    /// Top-level slots reserved in `items`
    max_items: usize,
    commands: Consumer<Command>,
    reports: Producer<Report>,
    spec: StreamSpec,
    /// Frames rendered so far
    frame: u64,
    /// Planar staging for interleaved backends
    scratch: AudioBuffer,
    /// Stand-in input when the caller provides none
    silence: AudioBuffer,
    tap: Option<Producer<f32>>,
}

impl Renderer {
    pub(crate) fn new(
        commands: Consumer<Command>,
        reports: Producer<Report>,
        spec: StreamSpec,
        max_items: usize,
    ) -> Self {
        Self {
            items: Vec::with_capacity(max_items),
            max_items,
            commands,
            reports,
            spec,
            frame: 0,
            scratch: AudioBuffer::new(spec.output_channels, spec.max_frames),
            silence: AudioBuffer::new(spec.input_channels, spec.max_frames),
            tap: None,
        }
    }

    pub fn spec(&self) -> StreamSpec {
        self.spec
    }

    /// Frames rendered since the renderer was created.
    pub fn frames_rendered(&self) -> u64 {
        self.frame
    }

    pub(crate) fn set_tap(&mut self, tap: Producer<f32>) {
        self.tap = Some(tap);
    }

    /// Re-prepare every live item for a new stream layout. Items that no
    /// longer prepare are stopped and dropped.
    ///
    /// Control side only: called before the renderer is handed to a backend.
    pub(crate) fn reconfigure(&mut self, spec: StreamSpec) {
        self.spec = spec;
        self.scratch = AudioBuffer::new(spec.output_channels, spec.max_frames);
        self.silence = AudioBuffer::new(spec.input_channels, spec.max_frames);

        let mut index = 0;
        while index < self.items.len() {
            match self.items[index].prepare(&spec) {
                Ok(()) => index += 1,
                Err(err) => {
                    let mut item = self.items.remove(index);
                    warn!(error = %err, "dropping item that failed to re-prepare");
                    item.stop();
                }
            }
        }
    }

    /// Render `frames` frames into `output`.
    ///
    /// `output` is zeroed for `frames` frames on every channel before items
    /// add into it. `input` is the live input offered to leaf items.
    pub fn process(
        &mut self,
        input: Option<&AudioBuffer>,
        output: &mut AudioBuffer,
        frames: usize,
        time: f64,
    ) {
        self.drain();

        let frames = frames.min(output.frames());
        output.clear(frames);

        let step = self.spec.max_frames.max(1);
        let mut offset = 0;
        while offset < frames {
            let n = step.min(frames - offset);
            let pass = Pass {
                input: input.unwrap_or(&self.silence),
                offset,
                frames: n,
                ctx: self.ctx(offset, time),
            };
            render_items(&mut self.items, &mut self.reports, &pass, output, offset);
            offset += n;
        }

        self.frame += frames as u64;
        if let Some(tap) = self.tap.as_mut() {
            feed_tap(tap, &output.channel(0)[..frames.min(output.channel(0).len())]);
        }
    }

    /// Render into an interleaved device buffer with `channels` channels.
    ///
    /// Stream time is derived from the frame counter.
    pub fn process_interleaved(&mut self, data: &mut [f32], channels: usize) {
        self.drain();

        if channels == 0 {
            return;
        }

        let time = self.frame as f64 / self.spec.sample_rate as f64;
        let frames = data.len() / channels;
        let step = self.spec.max_frames.max(1);

        let mut offset = 0;
        while offset < frames {
            let n = step.min(frames - offset);
            self.scratch.clear(n);
            let pass = Pass {
                input: &self.silence,
                offset: 0,
                frames: n,
                ctx: self.ctx(offset, time),
            };
            render_items(&mut self.items, &mut self.reports, &pass, &mut self.scratch, 0);
            self.scratch
                .write_interleaved(&mut data[offset * channels..], channels, n);

            if let Some(tap) = self.tap.as_mut() {
                feed_tap(tap, &self.scratch.channel(0)[..n.min(self.scratch.channel(0).len())]);
            }
            offset += n;
        }

        self.frame += frames as u64;
    }

    fn ctx(&self, offset: usize, time: f64) -> ProcessCtx {
        ProcessCtx {
            sample_rate: self.spec.sample_rate,
            time: time + offset as f64 / self.spec.sample_rate as f64,
            frame: self.frame + offset as u64,
        }
    }

    /// Apply the commands queued when the drain starts. Commands that arrive
    /// while draining wait for the next call, as do commands whose reports
    /// would not fit in the report ring.
    pub(crate) fn drain(&mut self) -> usize {
        let pending = self.commands.slots();
        let mut applied = 0;
        for _ in 0..pending {
            let needed = match self.commands.peek() {
                Ok(command) => self.reports_needed(command),
                Err(_) => break,
            };
            if self.reports.slots() < needed {
                break;
            }
            let Ok(command) = self.commands.pop() else {
                break;
            };
            self.apply(command);
            applied += 1;
        }
        applied
    }

    /// Upper bound on the reports applying `command` pushes.
    fn reports_needed(&self, command: &Command) -> usize {
        let Command::Message(msg) = command else {
            return 1;
        };
        let target = Address::parse(msg.address());
        match (target.path, target.command) {
            (None, CMD_REMOVE) => 2,
            (None, CMD_CLEAR) => self.items.len() + 1,
            _ => 1,
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Message(msg) => self.apply_message(msg),
            Command::Add { parent, item } => self.apply_add(parent, item),
        }
    }

    fn apply_add(&mut self, parent: Option<String>, item: GraphItem) {
        let (siblings, limit) = match parent.as_deref() {
            None => (Some(&mut self.items), self.max_items),
            Some(path) => (
                find_mut(&mut self.items, path).map(GraphItem::children_mut),
                usize::MAX,
            ),
        };

        let outcome = match siblings {
            None => Outcome::NoTarget,
            // Growing would allocate here
            Some(siblings) if siblings.len() >= limit.min(siblings.capacity()) => {
                Outcome::Rejected
            }
            Some(siblings) => {
                let label = item.label().clone();
                siblings.push(item);
                self.report(Report::Added { label, parent });
                return;
            }
        };

        self.report(Report::Processed {
            command: Command::Add { parent, item },
            outcome,
        });
    }

    fn apply_message(&mut self, mut msg: ControlMessage) {
        let address = msg.take_address();
        let target = Address::parse(&address);

        let outcome = match target.path {
            Some(path) => match find_mut(&mut self.items, path) {
                Some(item) => {
                    item.deliver(target.command, &mut msg);
                    Outcome::Delivered(1)
                }
                None => Outcome::NoTarget,
            },
            None => match target.command {
                CMD_REMOVE => self.remove(&mut msg),
                CMD_ROUTE => self.route(&mut msg),
                CMD_CLEAR => self.clear(),
                command => Outcome::Delivered(
                    self.items
                        .iter_mut()
                        .map(|item| item.broadcast(command, &mut msg))
                        .sum(),
                ),
            },
        };

        msg.set_address(address);
        self.report(Report::Processed {
            command: Command::Message(msg),
            outcome,
        });
    }

    fn remove(&mut self, msg: &mut ControlMessage) -> Outcome {
        let Some(path) = msg.try_read_str() else {
            return Outcome::Rejected;
        };

        match take(&mut self.items, path) {
            Some(item) => {
                self.report(Report::Removed(item));
                Outcome::Applied
            }
            None => Outcome::NoTarget,
        }
    }

    fn route(&mut self, msg: &mut ControlMessage) -> Outcome {
        let Some(span) = msg.try_read_str_span() else {
            return Outcome::Rejected;
        };
        let Some(routing) = msg
            .try_read_i32()
            .and_then(|index| Routing::from_index(index).ok())
        else {
            return Outcome::Rejected;
        };

        match find_mut(&mut self.items, msg.str_at(span)) {
            Some(item) => {
                item.set_routing(routing);
                Outcome::Applied
            }
            None => Outcome::NoTarget,
        }
    }

    fn clear(&mut self) -> Outcome {
        while let Some(item) = self.items.pop() {
            self.report(Report::Removed(item));
        }
        Outcome::Applied
    }

    fn report(&mut self, report: Report) {
        // Room was checked before the command was popped
        let pushed = self.reports.push(report);
        debug_assert!(pushed.is_ok());
    }

    /// Ids of every live item as `/`-joined paths, depth-first.
    pub fn item_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for item in &self.items {
            item.collect_paths("", &mut paths);
        }
        paths
    }

    pub fn find(&self, path: &str) -> Option<&GraphItem> {
        let (first, rest) = split_first(path);
        let item = self.items.iter().rev().find(|i| i.id() == first)?;
        match rest {
            Some(rest) => item.find(rest),
            None => Some(item),
        }
    }

    pub fn attribute(&self, path: &str, name: &str) -> Option<AttributeValue> {
        self.find(path).and_then(|item| item.attribute(name))
    }

    /// Stop every module, including items still waiting in the queue.
    ///
    /// Runs off the render thread, once the renderer is no longer driven.
    pub(crate) fn teardown(&mut self) {
        while let Ok(command) = self.commands.pop() {
            if let Command::Add { mut item, .. } = command {
                item.stop();
            }
        }

        let count = self.items.len();
        for mut item in self.items.drain(..) {
            item.stop();
        }
        if count > 0 {
            debug!(items = count, "renderer torn down");
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn render_items(
    items: &mut [GraphItem],
    reports: &mut Producer<Report>,
    pass: &Pass<'_>,
    dest: &mut AudioBuffer,
    dest_offset: usize,
) {
    for item in items {
        item.render(pass, dest, dest_offset, reports);
    }
}

fn feed_tap(tap: &mut Producer<f32>, samples: &[f32]) {
    for &sample in samples {
        if tap.push(sample).is_err() {
            break;
        }
    }
}

fn split_first(path: &str) -> (&str, Option<&str>) {
    match path.split_once(PATH_SEPARATOR) {
        Some((first, rest)) => (first, Some(rest)),
        None => (path, None),
    }
}

/// Resolve a `/`-separated path. Among siblings the last registered match
/// wins.
fn find_mut<'a>(items: &'a mut [GraphItem], path: &str) -> Option<&'a mut GraphItem> {
    let (first, rest) = split_first(path);
    let item = items.iter_mut().rev().find(|i| i.id() == first)?;
    match rest {
        Some(rest) => item.find_mut(rest),
        None => Some(item),
    }
}

/// Detach the item at `path` from its sibling list.
fn take(items: &mut Vec<GraphItem>, path: &str) -> Option<GraphItem> {
    let (siblings, id) = match path.rsplit_once(PATH_SEPARATOR) {
        Some((parent, id)) => (find_mut(items, parent)?.children_mut(), id),
        None => (items, path),
    };
    let index = siblings.iter().rposition(|item| item.id() == id)?;
    Some(siblings.remove(index))
}
