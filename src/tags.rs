//! Debug tags a template can call while it renders.
//!
//! Every tag is gated on [`DebugSettings::template_debug`]: when the gate is
//! off the tag does nothing and returns its empty value.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use crate::config::DebugSettings;
use crate::inspect::*;
use crate::model::{CallableLocation, Inspect, RenderingContext, Value};
use crate::renderer::{DisplayOptions, Render};

/// Context variables bound by name for an interactive session.
pub type Bindings = BTreeMap<String, Value>;

/// Host debugging facility `set_trace` hands control to.
#[cfg_attr(test, mockall::automock)]
pub trait Debugger {
    /// Blocks until the developer resumes rendering.
    fn set_trace(&mut self, bindings: &Bindings) -> Result<()>;
}

/// Looks up a dotted path (`user.groups`, `items.0`) against a first-segment
/// lookup, reading members for every following segment.
pub fn resolve_dotted<'a>(
    first: impl FnOnce(&str) -> Option<&'a Value>,
    path: &str,
) -> Option<Value> {
    let mut segments = path.split('.');
    let mut value = first(segments.next()?)?.clone();
    for segment in segments {
        let next = match (&value, segment.parse::<usize>()) {
            (Value::List(items), Ok(index)) => items.get(index)?.clone(),
            _ => value.member(segment).ok()?,
        };
        value = next;
    }
    Some(value)
}

const PROMPT: &str = "(tdb) ";

const HELP: &str = "\
availables        list the variables bound in this session
<name>[.<attr>]   show a variable and its template-visible attributes
c, continue       resume rendering
";

/// Line-oriented prompt over any reader/writer pair.
pub struct ConsoleDebugger<R, W> {
    input: R,
    output: W,
    proxy_labels: Vec<String>,
}

impl ConsoleDebugger<BufReader<Stdin>, Stdout> {
    pub fn stdio(proxy_labels: Vec<String>) -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout(), proxy_labels)
    }
}

impl<R: BufRead, W: Write> ConsoleDebugger<R, W> {
    pub fn new(input: R, output: W, proxy_labels: Vec<String>) -> Self {
        Self {
            input,
            output,
            proxy_labels,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn show(&mut self, bindings: &Bindings, path: &str) -> Result<()> {
        let Some(value) = resolve_dotted(|name| bindings.get(name), path) else {
            writeln!(self.output, "*** unknown variable: {}", path)?;
            return Ok(());
        };

        // Details sit indented under the value they describe
        let options = DisplayOptions::new().with_depth(1);
        writeln!(self.output, "{}", value.repr())?;
        let record = get_details_with(&value, &self.proxy_labels);
        write!(self.output, "{}", record.render(&options))?;
        Ok(())
    }
}

impl<R: BufRead, W: Write> Debugger for ConsoleDebugger<R, W> {
    fn set_trace(&mut self, bindings: &Bindings) -> Result<()> {
        let options = DisplayOptions::new();
        loop {
            write!(self.output, "{}", PROMPT)?;
            self.output.flush()?;

            let mut line = String::new();
            let read = self
                .input
                .read_line(&mut line)
                .context("Failed to read debugger input")?;
            if read == 0 {
                writeln!(self.output)?;
                break;
            }

            match line.trim() {
                "" => {}
                "c" | "continue" | "q" | "quit" => break,
                "help" | "h" => write!(self.output, "{}", HELP)?,
                "availables" => {
                    let names: Vec<String> = bindings.keys().cloned().collect();
                    write!(self.output, "{}", names.render(&options))?;
                }
                path => self.show(bindings, path)?,
            }
        }
        Ok(())
    }
}

/// Hands the bindings to a debugger listening on a TCP address.
///
/// The bindings go out as one JSON object of reprs, newline terminated, and
/// rendering resumes once the other side answers with a line. The first
/// connection failure marks the debugger unavailable for good; later calls
/// return at once without touching the network.
pub struct RemoteDebugger {
    address: SocketAddr,
    timeout: Duration,
    unavailable: bool,
}

impl RemoteDebugger {
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            timeout: Duration::from_secs(1),
            unavailable: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_available(&self) -> bool {
        !self.unavailable
    }
}

impl Debugger for RemoteDebugger {
    fn set_trace(&mut self, bindings: &Bindings) -> Result<()> {
        if self.unavailable {
            return Ok(());
        }

        let mut stream = match TcpStream::connect_timeout(&self.address, self.timeout) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(address = %self.address, "No remote debugger listening, disabling: {}", e);
                self.unavailable = true;
                return Ok(());
            }
        };

        let reprs: BTreeMap<&str, String> = bindings
            .iter()
            .map(|(name, value)| (name.as_str(), value.repr()))
            .collect();
        serde_json::to_writer(&mut stream, &reprs).context("Failed to send bindings")?;
        stream.write_all(b"\n")?;
        stream.shutdown(Shutdown::Write)?;

        let mut reply = String::new();
        BufReader::new(stream)
            .read_line(&mut reply)
            .context("Failed to read remote debugger reply")?;
        tracing::debug!(address = %self.address, reply = reply.trim(), "remote session ended");
        Ok(())
    }
}

/// The tag set, configured once and called per render.
pub struct DebugTags<W: Write = Stdout> {
    settings: DebugSettings,
    output: W,
    options: DisplayOptions,
    debugger: Box<dyn Debugger>,
    remote: Option<Box<dyn Debugger>>,
}

impl DebugTags<Stdout> {
    pub fn new(settings: DebugSettings) -> Self {
        Self::with_output(settings, io::stdout())
    }
}

impl<W: Write> DebugTags<W> {
    pub fn with_output(settings: DebugSettings, output: W) -> Self {
        let debugger = ConsoleDebugger::stdio(settings.proxy_labels.clone());
        let remote = settings
            .remote_debugger
            .map(|address| Box::new(RemoteDebugger::new(address)) as Box<dyn Debugger>);
        Self {
            settings,
            output,
            options: DisplayOptions::new(),
            debugger: Box::new(debugger),
            remote,
        }
    }

    pub fn with_debugger(mut self, debugger: impl Debugger + 'static) -> Self {
        self.debugger = Box::new(debugger);
        self
    }

    pub fn with_remote(mut self, debugger: impl Debugger + 'static) -> Self {
        self.remote = Some(Box::new(debugger));
        self
    }

    pub fn into_output(self) -> W {
        self.output
    }

    // No-op returning the empty value unless template debugging is on.
    fn require_template_debug<T: Default>(
        &mut self,
        tag: &str,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        if !self.settings.template_debug {
            tracing::debug!(tag, "template debugging is off; skipping");
            return T::default();
        }
        f(self)
    }

    fn emit(&mut self, text: &str) {
        let result = self
            .output
            .write_all(text.as_bytes())
            .and_then(|_| self.output.flush());
        if let Err(e) = result {
            tracing::warn!("Failed to write debug output: {}", e);
        }
    }

    /// Prints and returns the variables visible in `context`.
    pub fn variables(&mut self, context: &RenderingContext) -> Vec<String> {
        self.require_template_debug("variables", |tags| {
            let availables = get_variables(context);
            let text = availables.render(&tags.options);
            tags.emit(&text);
            availables
        })
    }

    /// Prints and returns the attributes of `value` a template can reach.
    pub fn attributes(&mut self, value: &Value) -> Vec<String> {
        self.require_template_debug("attributes", |tags| {
            let attrs = get_attributes(value);
            let text = attrs.render(&tags.options);
            tags.emit(&text);
            attrs
        })
    }

    /// Prints the metadata of `value`, then its attributes and their values.
    pub fn details(&mut self, value: &Value) -> InspectionRecord {
        self.require_template_debug("details", |tags| {
            let record = get_details_with(value, &tags.settings.proxy_labels);
            let text = record.render(&tags.options);
            tags.emit(&text);
            record
        })
    }

    /// Prints and returns where a callable `value` is defined.
    pub fn find(&mut self, value: &Value) -> Option<CallableLocation> {
        self.require_template_debug("find", |tags| {
            let found = find_func(value, tags.settings.root_path());
            let text = found.render(&tags.options);
            tags.emit(&text);
            found
        })
    }

    /// Hands every context variable to the debugger and blocks until the
    /// developer resumes. Always renders as an empty string.
    pub fn set_trace(&mut self, context: &RenderingContext) -> String {
        self.require_template_debug("set_trace", |tags| {
            let availables = get_variables(context);

            let mut text = String::from("Variables that are available in the current context:\n");
            text.push_str(&availables.render(&tags.options));
            text.push_str("Type `availables` to show this list.\n");
            text.push_str("Type <variable_name> to access one.\n");
            tags.emit(&text);

            let bindings = bind(context, &availables);
            if let Err(e) = tags.debugger.set_trace(&bindings) {
                tracing::warn!("Debugger session ended with an error: {:#}", e);
            }
            String::new()
        })
    }

    /// Like `set_trace`, but attaches to the configured remote debugger and
    /// prints nothing. Does nothing when no remote debugger is configured.
    pub fn remote_trace(&mut self, context: &RenderingContext) -> String {
        self.require_template_debug("remote_trace", |tags| {
            let Some(remote) = tags.remote.as_mut() else {
                tracing::debug!("no remote debugger configured");
                return String::new();
            };
            let bindings = bind(context, &get_variables(context));
            if let Err(e) = remote.set_trace(&bindings) {
                tracing::warn!("Remote debugger session ended with an error: {:#}", e);
            }
            String::new()
        })
    }
}

fn bind(context: &RenderingContext, names: &[String]) -> Bindings {
    names
        .iter()
        .filter_map(|name| Some((name.clone(), context.get(name)?.clone())))
        .collect()
}

/// What a tag call substitutes into the rendered page.
#[derive(Debug, Clone, PartialEq)]
pub enum TagOutput {
    Names(Vec<String>),
    Record(InspectionRecord),
    Location(Option<CallableLocation>),
    Text(String),
}

impl fmt::Display for TagOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let options = DisplayOptions::new().with_width(usize::MAX);
        match self {
            TagOutput::Names(names) => write!(f, "{}", names.render(&options).trim_end()),
            TagOutput::Record(record) => write!(f, "{}", record.render(&options).trim_end()),
            TagOutput::Location(Some(location)) => write!(f, "{}", location),
            TagOutput::Location(None) => Ok(()),
            TagOutput::Text(text) => write!(f, "{}", text),
        }
    }
}

pub type Tag<W> = fn(&mut DebugTags<W>, &RenderingContext, Option<&Value>) -> TagOutput;

/// Tags registered under the short names templates call them by.
pub struct TagLibrary<W: Write = Stdout> {
    tags: BTreeMap<String, Tag<W>>,
}

impl<W: Write> TagLibrary<W> {
    pub fn new() -> Self {
        Self {
            tags: BTreeMap::new(),
        }
    }

    /// A library with every debug tag registered.
    pub fn with_debug_tags() -> Self {
        let mut library = Self::new();
        library.register("variables", variables_tag::<W>);
        library.register("attributes", attributes_tag::<W>);
        library.register("details", details_tag::<W>);
        library.register("find", find_tag::<W>);
        library.register("set_trace", set_trace_tag::<W>);
        library.register("remote_trace", remote_trace_tag::<W>);
        library
    }

    pub fn register(&mut self, name: impl Into<String>, tag: Tag<W>) {
        self.tags.insert(name.into(), tag);
    }

    pub fn names(&self) -> Vec<&str> {
        self.tags.keys().map(String::as_str).collect()
    }

    /// Calls the tag registered as `name`, or returns `None` if there is none.
    pub fn call(
        &self,
        name: &str,
        tags: &mut DebugTags<W>,
        context: &RenderingContext,
        arg: Option<&Value>,
    ) -> Option<TagOutput> {
        let tag = self.tags.get(name)?;
        Some(tag(tags, context, arg))
    }
}

impl<W: Write> Default for TagLibrary<W> {
    fn default() -> Self {
        Self::new()
    }
}

fn variables_tag<W: Write>(
    tags: &mut DebugTags<W>,
    context: &RenderingContext,
    _arg: Option<&Value>,
) -> TagOutput {
    TagOutput::Names(tags.variables(context))
}

fn attributes_tag<W: Write>(
    tags: &mut DebugTags<W>,
    _context: &RenderingContext,
    arg: Option<&Value>,
) -> TagOutput {
    match arg {
        Some(value) => TagOutput::Names(tags.attributes(value)),
        None => {
            tracing::warn!("attributes tag called without a variable");
            TagOutput::Names(Vec::new())
        }
    }
}

fn details_tag<W: Write>(
    tags: &mut DebugTags<W>,
    _context: &RenderingContext,
    arg: Option<&Value>,
) -> TagOutput {
    match arg {
        Some(value) => TagOutput::Record(tags.details(value)),
        None => {
            tracing::warn!("details tag called without a variable");
            TagOutput::Record(InspectionRecord::default())
        }
    }
}

fn find_tag<W: Write>(
    tags: &mut DebugTags<W>,
    _context: &RenderingContext,
    arg: Option<&Value>,
) -> TagOutput {
    match arg {
        Some(value) => TagOutput::Location(tags.find(value)),
        None => {
            tracing::warn!("find tag called without a variable");
            TagOutput::Location(None)
        }
    }
}

fn set_trace_tag<W: Write>(
    tags: &mut DebugTags<W>,
    context: &RenderingContext,
    _arg: Option<&Value>,
) -> TagOutput {
    TagOutput::Text(tags.set_trace(context))
}

fn remote_trace_tag<W: Write>(
    tags: &mut DebugTags<W>,
    context: &RenderingContext,
    _arg: Option<&Value>,
) -> TagOutput {
    TagOutput::Text(tags.remote_trace(context))
}
