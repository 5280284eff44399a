use std::{
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use rtrb::Producer;
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    config::StreamSpec,
    error::{NetworkError, Result},
    graph::command::Report,
    io::AudioBuffer,
    message::{ControlMessage, PATH_SEPARATOR},
    module::{AttributeValue, ChannelLayout, Module, ProcessCtx},
};

/// Child slots reserved per item so that children added while live do not
/// reallocate on the render thread.
pub const MIN_CHILD_SLOTS: usize = 8;

/// Where an item's output lands in its destination buffer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Routing {
    /// Module output channel `i` goes to destination channel `i`.
    #[default]
    Module,
    /// Output is pinned starting at this destination channel. Pinned items
    /// are prepared mono.
    Channel(usize),
}

impl Routing {
    /// Convert the integer form: `-1` is [`Routing::Module`], `n >= 0` pins
    /// to channel `n`.
    pub fn from_index(index: i32) -> Result<Self> {
        match index {
            -1 => Ok(Routing::Module),
            n if n >= 0 => Ok(Routing::Channel(n as usize)),
            n => Err(NetworkError::InvalidRouting(n)),
        }
    }

    pub fn index(&self) -> i32 {
        match *self {
            Routing::Module => -1,
            Routing::Channel(n) => n as i32,
        }
    }

    fn first_channel(&self) -> usize {
        match *self {
            Routing::Module => 0,
            Routing::Channel(n) => n,
        }
    }
}

/// Per-pass render parameters shared by every item in the tree.
pub(crate) struct Pass<'a> {
    /// Live input of the network
    pub input: &'a AudioBuffer,
    /// Offset of this chunk within `input`
    pub offset: usize,
    pub frames: usize,
    pub ctx: ProcessCtx,
}

/// A node of the processing tree: a module, its output routing, and the
/// children whose outputs are summed into its input.
pub struct GraphItem {
    module: Box<dyn Module>,
    routing: Routing,
    children: Vec<GraphItem>,
    layout: ChannelLayout,
    input: AudioBuffer,
    output: AudioBuffer,
    label: Arc<str>,
    faults: u32,
}

impl GraphItem {
    pub fn new<M: Module + 'static>(module: M) -> Self {
        Self::from_boxed(Box::new(module))
    }

    pub fn from_boxed(module: Box<dyn Module>) -> Self {
        let label = Arc::from(module.id());
        Self {
            module,
            routing: Routing::Module,
            children: Vec::new(),
            layout: ChannelLayout::default(),
            input: AudioBuffer::default(),
            output: AudioBuffer::default(),
            label,
            faults: 0,
        }
    }

    pub fn with_routing(mut self, routing: Routing) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_child(mut self, child: GraphItem) -> Self {
        self.children.push(child);
        self
    }

    /// Replace the module. Only meaningful before the item is submitted.
    pub fn set_module<M: Module + 'static>(&mut self, module: M) {
        self.module = Box::new(module);
        self.label = Arc::from(self.module.id());
    }

    pub fn set_routing(&mut self, routing: Routing) {
        self.routing = routing;
    }

    pub fn add_child(&mut self, child: GraphItem) {
        self.children.push(child);
    }

    pub fn id(&self) -> &str {
        self.module.id()
    }

    pub fn module(&self) -> &dyn Module {
        self.module.as_ref()
    }

    pub fn module_mut(&mut self) -> &mut dyn Module {
        self.module.as_mut()
    }

    pub fn routing(&self) -> Routing {
        self.routing
    }

    pub fn children(&self) -> &[GraphItem] {
        &self.children
    }

    /// Channel counts agreed with the module at the last prepare.
    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Number of `process` calls that panicked.
    pub fn faults(&self) -> u32 {
        self.faults
    }

    pub(crate) fn label(&self) -> &Arc<str> {
        &self.label
    }

    /// Last-registered child with this id.
    pub fn child(&self, id: &str) -> Option<&GraphItem> {
        self.children.iter().rev().find(|c| c.id() == id)
    }

    pub fn child_mut(&mut self, id: &str) -> Option<&mut GraphItem> {
        self.children.iter_mut().rev().find(|c| c.id() == id)
    }

    /// Resolve a `/`-separated path relative to this item's children.
    pub fn find(&self, path: &str) -> Option<&GraphItem> {
        path.split(PATH_SEPARATOR).try_fold(self, |item, id| item.child(id))
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut GraphItem> {
        path.split(PATH_SEPARATOR)
            .try_fold(self, |item, id| item.child_mut(id))
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<GraphItem> {
        &mut self.children
    }

    pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
        self.module.attribute(name)
    }

    /// Check every id in the subtree.
    pub fn validate_ids(&self) -> Result<()> {
        let id = self.id();
        if id.is_empty() || id.contains(PATH_SEPARATOR) {
            return Err(NetworkError::InvalidId(id.to_owned()));
        }
        self.children.iter().try_for_each(GraphItem::validate_ids)
    }

    /// Negotiate channels with the module and allocate buffers, then do the
    /// same for every child. Children that fail are stopped and dropped; a
    /// failure of this item's own module is returned.
    pub fn prepare(&mut self, spec: &StreamSpec) -> Result<()> {
        let outputs = match self.routing {
            Routing::Module => spec.output_channels,
            Routing::Channel(_) => 1,
        };
        let mut layout = ChannelLayout::new(spec.input_channels.max(outputs), outputs);

        if !self.module.prepare(&mut layout, spec) {
            return Err(NetworkError::PrepareFailed {
                id: self.id().to_owned(),
            });
        }

        self.layout = layout;
        self.label = Arc::from(self.module.id());
        self.input = AudioBuffer::new(layout.inputs, spec.max_frames);
        self.output = AudioBuffer::new(layout.outputs, spec.max_frames);

        let mut index = 0;
        while index < self.children.len() {
            match self.children[index].prepare(spec) {
                Ok(()) => index += 1,
                Err(err) => {
                    let mut child = self.children.remove(index);
                    warn!(parent = %self.label, error = %err, "dropping child that failed to prepare");
                    child.stop();
                }
            }
        }

        let reserve = MIN_CHILD_SLOTS.saturating_sub(self.children.len());
        self.children.reserve(reserve);
        Ok(())
    }

    /// Deliver a message to this item's module.
    pub(crate) fn deliver(&mut self, command: &str, data: &mut ControlMessage) {
        data.rewind();
        self.module.event_process(command, data);
    }

    /// Deliver to this module and every descendant, depth-first. Returns the
    /// number of modules reached.
    pub(crate) fn broadcast(&mut self, command: &str, data: &mut ControlMessage) -> usize {
        self.deliver(command, data);
        1 + self
            .children
            .iter_mut()
            .map(|child| child.broadcast(command, data))
            .sum::<usize>()
    }

    /// Render this subtree and add its output into `dest` at `dest_offset`.
    ///
    /// Runs on the render thread.
    pub(crate) fn render(
        &mut self,
        pass: &Pass<'_>,
        dest: &mut AudioBuffer,
        dest_offset: usize,
        reports: &mut Producer<Report>,
    ) {
        let frames = pass.frames;

        if self.children.is_empty() {
            self.input.copy_from(pass.input, pass.offset, frames);
        } else {
            self.input.clear(frames);
            for child in &mut self.children {
                child.render(pass, &mut self.input, 0, reports);
            }
        }

        self.output.clear(frames);

        let module = &mut self.module;
        let input = &self.input;
        let output = &mut self.output;
        let ctx = &pass.ctx;
        let processed =
            catch_unwind(AssertUnwindSafe(|| module.process(input, output, frames, ctx))).is_ok();

        if !processed {
            self.faults = self.faults.saturating_add(1);
            if self.faults == 1 {
                // Dropped if the ring is full; the count is still kept
                let _ = reports.push(Report::Fault(Arc::clone(&self.label)));
            }
            return;
        }

        self.output
            .accumulate_into(dest, self.routing.first_channel(), dest_offset, frames);
    }

    /// Stop every module in the subtree, children first.
    pub fn stop(&mut self) -> bool {
        let mut ok = true;
        for child in &mut self.children {
            ok &= child.stop();
        }
        if !self.module.stop() {
            warn!(module = %self.label, "module failed to stop cleanly");
            ok = false;
        }
        ok
    }

    /// Collect `/`-joined paths of this subtree, depth-first.
    pub(crate) fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        let path = if prefix.is_empty() {
            self.id().to_owned()
        } else {
            format!("{prefix}{PATH_SEPARATOR}{}", self.id())
        };
        for child in &self.children {
            child.collect_paths(&path, out);
        }
        out.push(path);
    }
}

impl fmt::Debug for GraphItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphItem")
            .field("id", &self.id())
            .field("routing", &self.routing)
            .field("layout", &self.layout)
            .field("children", &self.children)
            .finish()
    }
}
