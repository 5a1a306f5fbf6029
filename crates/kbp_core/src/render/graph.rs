//! Composition graph: an explicit tree of typed filter nodes.
//!
//! The compiler builds the tree; it is only turned into an ffmpeg
//! `-filter_complex` string by [`CompositionGraph::serialize`].

use serde::Serialize;

/// Stream type of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    fn specifier(&self) -> &'static str {
        match self {
            Self::Video => "v",
            Self::Audio => "a",
        }
    }
}

/// One ffmpeg filter with its options.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filter {
    pub name: String,
    /// `(Some(key), value)` renders as `key=value`, `(None, value)` as a
    /// positional value.
    pub args: Vec<(Option<String>, String)>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Add a positional value.
    pub fn arg(mut self, value: impl ToString) -> Self {
        self.args.push((None, value.to_string()));
        self
    }

    /// Add a `key=value` option.
    pub fn opt(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.args.push((Some(key.into()), value.to_string()));
        self
    }

    /// Value of a named option.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(k, _)| k.as_deref() == Some(key))
            .map(|(_, v)| v.as_str())
    }

    /// Filter text as used inside a filtergraph.
    pub fn render(&self) -> String {
        if self.args.is_empty() {
            return self.name.clone();
        }
        let args: Vec<String> = self
            .args
            .iter()
            .map(|(key, value)| match key {
                Some(key) => format!("{}={}", key, escape_filter_value(value)),
                None => escape_filter_value(value),
            })
            .collect();
        format!("{}={}", self.name, args.join(":"))
    }
}

/// Escape an option value for both filtergraph parsing levels.
///
/// The option level needs `\ ' :` escaped; the graph level additionally
/// treats `\ ' [ ] , ;` as special.
pub fn escape_filter_value(value: &str) -> String {
    let mut option_level = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            option_level.push('\\');
        }
        option_level.push(c);
    }
    let mut graph_level = String::with_capacity(option_level.len());
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph_level.push('\\');
        }
        graph_level.push(c);
    }
    graph_level
}

/// What happens when the overlaid stream ends before the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EofAction {
    /// Keep showing the last frame.
    Repeat,
    /// Show the base alone.
    Pass,
}

impl EofAction {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Repeat => "repeat",
            Self::Pass => "pass",
        }
    }
}

/// A node of the composition tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    /// Stream of an input file, by input index.
    Input { index: usize, kind: StreamKind },
    /// Generated source such as `color`.
    Source(Filter),
    /// A filter applied to one upstream node.
    Filter { filter: Filter, input: Box<Node> },
    /// `top` drawn onto `base` at `(x, y)`.
    Overlay {
        base: Box<Node>,
        top: Box<Node>,
        x: u32,
        y: u32,
        eof: EofAction,
    },
    /// Segments played one after another.
    Concat { segments: Vec<Node>, kind: StreamKind },
    /// Audio streams mixed together.
    Mix { inputs: Vec<Node> },
}

impl Node {
    pub fn input(index: usize, kind: StreamKind) -> Self {
        Self::Input { index, kind }
    }

    pub fn source(filter: Filter) -> Self {
        Self::Source(filter)
    }

    /// Apply a filter to this node.
    pub fn then(self, filter: Filter) -> Self {
        Self::Filter {
            filter,
            input: Box::new(self),
        }
    }

    pub fn overlay(self, top: Node, x: u32, y: u32, eof: EofAction) -> Self {
        Self::Overlay {
            base: Box::new(self),
            top: Box::new(top),
            x,
            y,
            eof,
        }
    }

    /// Names of every filter in the subtree, depth first, base before top.
    pub fn filter_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut Vec<String>) {
        match self {
            Node::Input { .. } => {}
            Node::Source(filter) => names.push(filter.name.clone()),
            Node::Filter { filter, input } => {
                input.collect_names(names);
                names.push(filter.name.clone());
            }
            Node::Overlay { base, top, .. } => {
                base.collect_names(names);
                top.collect_names(names);
                names.push("overlay".to_string());
            }
            Node::Concat { segments, .. } => {
                for segment in segments {
                    segment.collect_names(names);
                }
                names.push("concat".to_string());
            }
            Node::Mix { inputs } => {
                for input in inputs {
                    input.collect_names(names);
                }
                names.push("amix".to_string());
            }
        }
    }

    /// First filter with this name in the subtree.
    pub fn find_filter(&self, name: &str) -> Option<&Filter> {
        match self {
            Node::Input { .. } => None,
            Node::Source(filter) => (filter.name == name).then_some(filter),
            Node::Filter { filter, input } => {
                if filter.name == name {
                    Some(filter)
                } else {
                    input.find_filter(name)
                }
            }
            Node::Overlay { base, top, .. } => {
                base.find_filter(name).or_else(|| top.find_filter(name))
            }
            Node::Concat { segments, .. } => segments.iter().find_map(|s| s.find_filter(name)),
            Node::Mix { inputs } => inputs.iter().find_map(|s| s.find_filter(name)),
        }
    }
}

/// Video tree plus optional audio tree of one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionGraph {
    pub video: Node,
    pub audio: Option<Node>,
}

/// Filtergraph text and stream mappings for the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedGraph {
    pub filter_complex: Option<String>,
    pub video_map: String,
    pub audio_map: Option<String>,
}

impl CompositionGraph {
    pub fn serialize(&self) -> SerializedGraph {
        let mut out = Serializer::default();
        let video_map = out.emit_root(&self.video, "vout");
        let audio_map = self.audio.as_ref().map(|a| out.emit_root(a, "aout"));
        SerializedGraph {
            filter_complex: (!out.chains.is_empty()).then(|| out.chains.join(";")),
            video_map,
            audio_map,
        }
    }
}

#[derive(Default)]
struct Serializer {
    chains: Vec<String>,
    next: usize,
}

impl Serializer {
    /// Emit a root node, returning the `-map` value for it.
    fn emit_root(&mut self, node: &Node, label: &str) -> String {
        match node {
            Node::Input { index, kind } => format!("{}:{}", index, kind.specifier()),
            _ => {
                self.emit(node, Some(label));
                format!("[{}]", label)
            }
        }
    }

    fn label(&mut self, requested: Option<&str>) -> String {
        match requested {
            Some(label) => format!("[{}]", label),
            None => {
                let label = format!("[n{}]", self.next);
                self.next += 1;
                label
            }
        }
    }

    /// Emit a node and return the pad label carrying its output.
    fn emit(&mut self, node: &Node, requested: Option<&str>) -> String {
        match node {
            Node::Input { index, kind } => format!("[{}:{}]", index, kind.specifier()),
            Node::Source(filter) => {
                let out = self.label(requested);
                self.chains.push(format!("{}{}", filter.render(), out));
                out
            }
            Node::Filter { filter, input } => {
                let input = self.emit(input, None);
                let out = self.label(requested);
                self.chains
                    .push(format!("{}{}{}", input, filter.render(), out));
                out
            }
            Node::Overlay {
                base,
                top,
                x,
                y,
                eof,
            } => {
                let base = self.emit(base, None);
                let top = self.emit(top, None);
                let out = self.label(requested);
                self.chains.push(format!(
                    "{}{}overlay=x={}:y={}:eof_action={}{}",
                    base,
                    top,
                    x,
                    y,
                    eof.as_str(),
                    out
                ));
                out
            }
            Node::Concat { segments, kind } => {
                let inputs: String = segments.iter().map(|s| self.emit(s, None)).collect();
                let out = self.label(requested);
                let (v, a) = match kind {
                    StreamKind::Video => (1, 0),
                    StreamKind::Audio => (0, 1),
                };
                self.chains.push(format!(
                    "{}concat=n={}:v={}:a={}{}",
                    inputs,
                    segments.len(),
                    v,
                    a,
                    out
                ));
                out
            }
            Node::Mix { inputs } => {
                let labels: String = inputs.iter().map(|s| self.emit(s, None)).collect();
                let out = self.label(requested);
                self.chains.push(format!(
                    "{}amix=inputs={}:duration=longest:dropout_transition=0:normalize=0{}",
                    labels,
                    inputs.len(),
                    out
                ));
                out
            }
        }
    }
}
