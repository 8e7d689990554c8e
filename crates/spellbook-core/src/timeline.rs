//! Version tree and depth-first timeline walk.
//!
//! Every command creates one version. Energize commands hang their version
//! under the current one; rewinds hang theirs under the target. Either way
//! the new version becomes current:
//!
//! ```text
//!   + a      - 0      + b      - 1
//!
//!        0
//!       / \
//!      1   2
//!      |   |
//!      4   3
//!   (1 = +a, 2 = -0, 3 = +b, 4 = -1)
//! ```
//!
//! Walking the tree depth-first with apply-on-enter and revert-on-exit
//! keeps exactly the root-to-version layers active at each visit, so one
//! mutable [`LayerState`] with LIFO undo answers every branch.

use std::fmt;

use crate::error::TimelineError;
use crate::layer::Layer;
use crate::Result;

/// Something the walk can apply layers to and roll back.
///
/// Marks are handed back in strict LIFO order.
pub trait LayerState {
    /// Token that undoes one [`LayerState::apply`].
    type Mark;

    /// Activate `layer` and return the mark that removes it.
    fn apply(&mut self, layer: &Layer) -> Result<Self::Mark>;

    /// Undo the most recent un-reverted apply.
    fn revert(&mut self, mark: Self::Mark) -> Result<()>;

    /// Total energy with the currently active layers.
    fn total(&self) -> i128;
}

/// Index of a version in the tree. Version 0 is the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionId(usize);

impl VersionId {
    /// The initial, layer-free version.
    pub const ROOT: VersionId = VersionId(0);

    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// One input command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// `+ l r k p x`
    Energize(Layer),
    /// `- t`
    Rewind(VersionId),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Energize(layer) => write!(
                f,
                "+ {} {} {} {} {}",
                layer.start,
                layer.end,
                layer.label.key,
                layer.label.parity.bit(),
                layer.label.magnitude
            ),
            Command::Rewind(target) => write!(f, "- {}", target.index()),
        }
    }
}

#[derive(Debug, Clone)]
struct Version {
    parent: Option<VersionId>,
    layer: Option<Layer>,
    children: Vec<VersionId>,
}

/// Per-command totals, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answers {
    totals: Vec<i128>,
}

impl Answers {
    pub fn new(totals: Vec<i128>) -> Self {
        Self { totals }
    }

    /// Total after command `command` (1-based).
    pub fn get(&self, command: usize) -> Option<i128> {
        command.checked_sub(1).and_then(|i| self.totals.get(i)).copied()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn as_slice(&self) -> &[i128] {
        &self.totals
    }

    pub fn iter(&self) -> impl Iterator<Item = i128> + '_ {
        self.totals.iter().copied()
    }

    pub fn into_vec(self) -> Vec<i128> {
        self.totals
    }
}

impl<'a> IntoIterator for &'a Answers {
    type Item = &'a i128;
    type IntoIter = std::slice::Iter<'a, i128>;

    fn into_iter(self) -> Self::IntoIter {
        self.totals.iter()
    }
}

/// One level of the explicit DFS stack.
struct Frame<M> {
    version: VersionId,
    next_child: usize,
    mark: Option<M>,
}

/// The version tree built from a command stream.
#[derive(Debug, Clone)]
pub struct Timeline {
    positions: usize,
    versions: Vec<Version>,
    current: VersionId,
}

impl Timeline {
    /// Create a timeline holding only the root version.
    pub fn new(positions: usize) -> Self {
        Self {
            positions,
            versions: vec![Version { parent: None, layer: None, children: Vec::new() }],
            current: VersionId::ROOT,
        }
    }

    /// Build a timeline from a whole command stream.
    pub fn from_commands<I>(positions: usize, commands: I) -> Result<Self>
    where
        I: IntoIterator<Item = Command>,
    {
        let mut timeline = Self::new(positions);
        for command in commands {
            timeline.push(command)?;
        }
        Ok(timeline)
    }

    /// Append the version for the next command and make it current.
    pub fn push(&mut self, command: Command) -> std::result::Result<VersionId, TimelineError> {
        let id = VersionId(self.versions.len());

        let (parent, layer) = match command {
            Command::Energize(layer) => {
                if !layer.fits(self.positions) {
                    return Err(TimelineError::LayerOutOfBounds {
                        command: id.0,
                        start: layer.start,
                        end: layer.end,
                        len: self.positions,
                    });
                }
                (self.current, Some(layer))
            }
            Command::Rewind(target) => {
                if target.0 >= id.0 {
                    return Err(TimelineError::RewindAhead { command: id.0, target: target.0 });
                }
                (target, None)
            }
        };

        self.versions[parent.0].children.push(id);
        self.versions.push(Version { parent: Some(parent), layer, children: Vec::new() });
        self.current = id;
        Ok(id)
    }

    /// Number of positions layers may cover.
    pub fn positions(&self) -> usize {
        self.positions
    }

    /// Number of commands pushed so far.
    pub fn commands(&self) -> usize {
        self.versions.len() - 1
    }

    /// The version the next energize command would extend.
    pub fn current(&self) -> VersionId {
        self.current
    }

    pub fn parent(&self, version: VersionId) -> Option<VersionId> {
        self.versions.get(version.0).and_then(|v| v.parent)
    }

    /// Children in creation order.
    pub fn children(&self, version: VersionId) -> &[VersionId] {
        self.versions.get(version.0).map(|v| v.children.as_slice()).unwrap_or(&[])
    }

    pub fn layer(&self, version: VersionId) -> Option<&Layer> {
        self.versions.get(version.0).and_then(|v| v.layer.as_ref())
    }

    /// Layers active at `version`, root first.
    pub fn active_layers(&self, version: VersionId) -> Vec<Layer> {
        let mut layers = Vec::new();
        let mut cursor = Some(version).filter(|v| v.0 < self.versions.len());
        while let Some(v) = cursor {
            if let Some(layer) = self.versions[v.0].layer {
                layers.push(layer);
            }
            cursor = self.versions[v.0].parent;
        }
        layers.reverse();
        layers
    }

    /// Visit every version depth-first and record its total.
    ///
    /// `state` must be in its layer-free condition; it is returned to that
    /// condition when the walk completes.
    pub fn walk<S: LayerState>(&self, state: &mut S) -> Result<Answers> {
        let mut totals = vec![0i128; self.versions.len()];
        let mut stack = vec![self.enter(state, VersionId::ROOT, &mut totals)?];
        let mut max_depth = 1;

        loop {
            let Some(frame) = stack.last_mut() else { break };
            let next = self.versions[frame.version.0].children.get(frame.next_child).copied();

            match next {
                Some(child) => {
                    frame.next_child += 1;
                    let entered = self.enter(state, child, &mut totals)?;
                    stack.push(entered);
                    max_depth = max_depth.max(stack.len());
                }
                None => {
                    if let Some(Frame { mark: Some(mark), version, .. }) = stack.pop() {
                        state.revert(mark)?;
                        tracing::trace!(%version, "left version");
                    }
                }
            }
        }

        tracing::debug!(versions = self.versions.len(), max_depth, "timeline walk finished");
        totals.remove(0);
        Ok(Answers::new(totals))
    }

    fn enter<S: LayerState>(
        &self,
        state: &mut S,
        version: VersionId,
        totals: &mut [i128],
    ) -> Result<Frame<S::Mark>> {
        let mark = match &self.versions[version.0].layer {
            Some(layer) => Some(state.apply(layer)?),
            None => None,
        };
        totals[version.0] = state.total();
        tracing::trace!(%version, total = %totals[version.0], "entered version");
        Ok(Frame { version, next_child: 0, mark })
    }
}
