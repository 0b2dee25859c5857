//! Startup lifecycle of the fractal shader program.
//!
//! Both stages are parsed and validated with naga's GLSL frontend before any
//! GPU object exists:
//!
//! ```text
//! Created ─▶ StageCompiled(vertex) ─▶ StageCompiled(fragment) ─▶ Linked ─▶ Validated ─▶ Ready
//!    └──────────────┴───────────────────────┴─────────────────────┴───────────┴──▶ Failed(diagnostic)
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use wgpu::naga;

/// Size of the diagnostic buffer, including the slot a C string would spend on
/// its terminator.
pub const DIAGNOSTIC_CAPACITY: usize = 1024;

/// Entry point name expected in both stages.
pub const ENTRY_POINT: &str = "main";

/// Compiler or linker output, bounded to `DIAGNOSTIC_CAPACITY - 1` bytes.
///
/// Longer messages are cut on a character boundary and flagged as truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    text: String,
    truncated: bool,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        let mut text = message.into();
        let limit = DIAGNOSTIC_CAPACITY - 1;
        let truncated = text.len() > limit;
        if truncated {
            let mut cut = limit;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }
        Self { text, truncated }
    }

    fn or_fallback(message: String, fallback: &str) -> Self {
        if message.trim().is_empty() {
            Self::new(fallback)
        } else {
            Self::new(message)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)?;
        if self.truncated {
            f.write_str(" [...]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStageKind {
    Vertex,
    Fragment,
}

impl ShaderStageKind {
    fn naga_stage(self) -> naga::ShaderStage {
        match self {
            ShaderStageKind::Vertex => naga::ShaderStage::Vertex,
            ShaderStageKind::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStageKind::Vertex => f.write_str("vertex"),
            ShaderStageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Position of the program builder in its linear lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramStage {
    Created,
    StageCompiled(ShaderStageKind),
    Linked,
    Validated,
    Ready,
    Failed(Diagnostic),
}

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("failed to read shader source at {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to compile {stage} shader:\n{diagnostic}")]
    Compile {
        stage: ShaderStageKind,
        diagnostic: Diagnostic,
    },
    #[error("failed to link shader program:\n{diagnostic}")]
    Link { diagnostic: Diagnostic },
    #[error("shader program failed validation:\n{diagnostic}")]
    Validate { diagnostic: Diagnostic },
    #[error("shader program builder was already used")]
    AlreadyBuilt,
}

impl ProgramError {
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ProgramError::Compile { diagnostic, .. }
            | ProgramError::Link { diagnostic }
            | ProgramError::Validate { diagnostic } => Some(diagnostic),
            ProgramError::SourceUnavailable { .. } | ProgramError::AlreadyBuilt => None,
        }
    }
}

/// Reads a shader file in full. A missing file is reported separately from a
/// shader that fails to compile.
pub fn load_shader_source(path: &Path) -> Result<String, ProgramError> {
    fs::read_to_string(path).map_err(|source| ProgramError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

/// Uniforms the fractal shader consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UniformName {
    MaxIterations,
    Center,
    Rotation,
    Zoom,
}

impl UniformName {
    pub const ALL: [UniformName; 4] = [
        UniformName::MaxIterations,
        UniformName::Center,
        UniformName::Rotation,
        UniformName::Zoom,
    ];

    /// Member name inside the GLSL uniform block.
    pub fn glsl_name(self) -> &'static str {
        match self {
            UniformName::MaxIterations => "max_iter",
            UniformName::Center => "center",
            UniformName::Rotation => "rotation",
            UniformName::Zoom => "zoom",
        }
    }

    /// Byte offset and type the CPU writes this uniform with (std140).
    pub fn expected_layout(self) -> (u32, SlotKind) {
        match self {
            UniformName::Center => (0, SlotKind::Vec4F32),
            UniformName::Zoom => (16, SlotKind::Vec4F32),
            UniformName::Rotation => (32, SlotKind::F32),
            UniformName::MaxIterations => (36, SlotKind::U32),
        }
    }
}

impl fmt::Display for UniformName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glsl_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotKind {
    F32,
    U32,
    Vec4F32,
    Other(String),
}

impl SlotKind {
    fn of(inner: &naga::TypeInner) -> Self {
        match inner {
            naga::TypeInner::Scalar(scalar) if *scalar == naga::Scalar::F32 => SlotKind::F32,
            naga::TypeInner::Scalar(scalar) if *scalar == naga::Scalar::U32 => SlotKind::U32,
            naga::TypeInner::Vector {
                size: naga::VectorSize::Quad,
                scalar,
            } if *scalar == naga::Scalar::F32 => SlotKind::Vec4F32,
            other => SlotKind::Other(format!("{other:?}")),
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::F32 => f.write_str("float"),
            SlotKind::U32 => f.write_str("uint"),
            SlotKind::Vec4F32 => f.write_str("vec4"),
            SlotKind::Other(description) => f.write_str(description),
        }
    }
}

/// Where a named uniform lives once the program is linked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    pub name: UniformName,
    pub group: u32,
    pub binding: u32,
    pub offset: u32,
    pub kind: SlotKind,
}

/// A linked and validated program, ready to be turned into a GPU pipeline.
///
/// The per-stage naga modules are dropped after linking; the program keeps
/// the sources for pipeline creation plus the resolved uniform slots.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    vertex_source: String,
    fragment_source: String,
    slots: BTreeMap<UniformName, UniformSlot>,
}

impl ShaderProgram {
    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    pub fn uniform_slot(&self, name: UniformName) -> Option<&UniformSlot> {
        self.slots.get(&name)
    }

    pub fn uniform_slots(&self) -> impl Iterator<Item = &UniformSlot> {
        self.slots.values()
    }

    /// Bind group and binding index of the uniform block.
    pub fn uniform_block(&self) -> (u32, u32) {
        self.slots
            .values()
            .next()
            .map(|slot| (slot.group, slot.binding))
            .unwrap_or((0, 0))
    }
}

/// What validation needs to know about a linked program.
struct LinkedInterface {
    vertex_entry: Option<String>,
    fragment_entry: Option<String>,
    writes_position: bool,
    fragment_outputs: BTreeMap<u32, naga::TypeInner>,
    slots: BTreeMap<UniformName, UniformSlot>,
}

/// Drives a vertex/fragment pair through compile, link and validate.
///
/// A manager builds at most one program; it records the stage it reached so a
/// failure can be inspected after the fact.
#[derive(Debug)]
pub struct ShaderProgramManager {
    stage: ProgramStage,
}

impl ShaderProgramManager {
    pub fn new() -> Self {
        Self {
            stage: ProgramStage::Created,
        }
    }

    pub fn stage(&self) -> &ProgramStage {
        &self.stage
    }

    pub fn build(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ShaderProgram, ProgramError> {
        if self.stage != ProgramStage::Created {
            return Err(ProgramError::AlreadyBuilt);
        }

        let vertex = self.compile(ShaderStageKind::Vertex, vertex_source)?;
        let fragment = self.compile(ShaderStageKind::Fragment, fragment_source)?;

        let interface = match link(&vertex, &fragment) {
            Ok(interface) => interface,
            Err(diagnostic) => return Err(self.fail(ProgramError::Link { diagnostic })),
        };
        self.advance(ProgramStage::Linked);
        drop(vertex);
        drop(fragment);
        tracing::debug!("released per-stage shader modules");

        if let Err(diagnostic) = validate(&interface) {
            return Err(self.fail(ProgramError::Validate { diagnostic }));
        }
        self.advance(ProgramStage::Validated);

        let program = ShaderProgram {
            vertex_source: vertex_source.to_owned(),
            fragment_source: fragment_source.to_owned(),
            slots: interface.slots,
        };
        self.advance(ProgramStage::Ready);
        Ok(program)
    }

    fn compile(
        &mut self,
        stage: ShaderStageKind,
        source: &str,
    ) -> Result<naga::Module, ProgramError> {
        match compile_stage(stage, source) {
            Ok(module) => {
                self.advance(ProgramStage::StageCompiled(stage));
                Ok(module)
            }
            Err(diagnostic) => Err(self.fail(ProgramError::Compile { stage, diagnostic })),
        }
    }

    fn advance(&mut self, next: ProgramStage) {
        tracing::debug!(from = ?self.stage, to = ?next, "shader program transition");
        self.stage = next;
    }

    fn fail(&mut self, error: ProgramError) -> ProgramError {
        if let Some(diagnostic) = error.diagnostic() {
            self.advance(ProgramStage::Failed(diagnostic.clone()));
        }
        error
    }
}

impl Default for ShaderProgramManager {
    fn default() -> Self {
        Self::new()
    }
}

fn compile_stage(stage: ShaderStageKind, source: &str) -> Result<naga::Module, Diagnostic> {
    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(stage.naga_stage());
    let module = frontend.parse(&options, source).map_err(|errors| {
        let mut message = String::new();
        for error in &errors.errors {
            let location = error.meta.location(source);
            message.push_str(&format!(
                "{}:{}: {}\n",
                location.line_number, location.line_position, error.kind
            ));
        }
        Diagnostic::or_fallback(message, "GLSL frontend rejected the source")
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    );
    validator
        .validate(&module)
        .map_err(|error| Diagnostic::or_fallback(error_chain(&error), "module failed validation"))?;

    Ok(module)
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn entry_point(module: &naga::Module, stage: naga::ShaderStage) -> Option<&naga::EntryPoint> {
    module.entry_points.iter().find(|entry| entry.stage == stage)
}

/// Collects `location -> type` for an interface value, flattening structs.
/// Returns whether a `Position` builtin was seen.
fn interface_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut BTreeMap<u32, naga::TypeInner>,
) -> bool {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            out.insert(*location, module.types[ty].inner.clone());
            false
        }
        Some(naga::Binding::BuiltIn(builtin)) => {
            matches!(builtin, naga::BuiltIn::Position { .. })
        }
        None => match &module.types[ty].inner {
            naga::TypeInner::Struct { members, .. } => {
                let mut position = false;
                for member in members {
                    position |= interface_locations(module, member.ty, member.binding.as_ref(), out);
                }
                position
            }
            _ => false,
        },
    }
}

fn find_uniform(module: &naga::Module, name: UniformName) -> Option<UniformSlot> {
    for (_, variable) in module.global_variables.iter() {
        if variable.space != naga::AddressSpace::Uniform {
            continue;
        }
        let Some(resource) = variable.binding.as_ref() else {
            continue;
        };
        match &module.types[variable.ty].inner {
            naga::TypeInner::Struct { members, .. } => {
                let member = members
                    .iter()
                    .find(|member| member.name.as_deref() == Some(name.glsl_name()));
                if let Some(member) = member {
                    return Some(UniformSlot {
                        name,
                        group: resource.group,
                        binding: resource.binding,
                        offset: member.offset,
                        kind: SlotKind::of(&module.types[member.ty].inner),
                    });
                }
            }
            inner if variable.name.as_deref() == Some(name.glsl_name()) => {
                return Some(UniformSlot {
                    name,
                    group: resource.group,
                    binding: resource.binding,
                    offset: 0,
                    kind: SlotKind::of(inner),
                });
            }
            _ => {}
        }
    }
    None
}

fn link(vertex: &naga::Module, fragment: &naga::Module) -> Result<LinkedInterface, Diagnostic> {
    let mut problems = Vec::new();

    let vertex_entry = entry_point(vertex, naga::ShaderStage::Vertex);
    let fragment_entry = entry_point(fragment, naga::ShaderStage::Fragment);

    let mut vertex_outputs = BTreeMap::new();
    let mut writes_position = false;
    match vertex_entry {
        Some(entry) => {
            if let Some(result) = entry.function.result.as_ref() {
                writes_position = interface_locations(
                    vertex,
                    result.ty,
                    result.binding.as_ref(),
                    &mut vertex_outputs,
                );
            }
        }
        None => problems.push("vertex stage has no vertex entry point".to_string()),
    }

    let mut fragment_inputs = BTreeMap::new();
    let mut fragment_outputs = BTreeMap::new();
    match fragment_entry {
        Some(entry) => {
            for argument in &entry.function.arguments {
                interface_locations(
                    fragment,
                    argument.ty,
                    argument.binding.as_ref(),
                    &mut fragment_inputs,
                );
            }
            if let Some(result) = entry.function.result.as_ref() {
                interface_locations(
                    fragment,
                    result.ty,
                    result.binding.as_ref(),
                    &mut fragment_outputs,
                );
            }
        }
        None => problems.push("fragment stage has no fragment entry point".to_string()),
    }

    for (location, input) in &fragment_inputs {
        match vertex_outputs.get(location) {
            None => problems.push(format!(
                "fragment input at location {location} is not written by the vertex stage"
            )),
            Some(output) if output != input => problems.push(format!(
                "location {location} type mismatch: vertex writes {output:?}, fragment reads {input:?}"
            )),
            Some(_) => {}
        }
    }

    let mut slots = BTreeMap::new();
    for name in UniformName::ALL {
        let from_fragment = find_uniform(fragment, name);
        let from_vertex = find_uniform(vertex, name);
        let slot = match (from_fragment, from_vertex) {
            (Some(a), Some(b)) if a != b => {
                problems.push(format!(
                    "uniform `{name}` is declared differently in the vertex and fragment stages"
                ));
                continue;
            }
            (Some(slot), _) | (None, Some(slot)) => slot,
            (None, None) => {
                problems.push(format!("uniform `{name}` is not declared"));
                continue;
            }
        };

        let (offset, kind) = name.expected_layout();
        if slot.kind != kind {
            problems.push(format!(
                "uniform `{name}` has type {}, expected {kind}",
                slot.kind
            ));
        }
        if slot.offset != offset {
            problems.push(format!(
                "uniform `{name}` sits at byte offset {}, expected {offset}",
                slot.offset
            ));
        }
        slots.insert(name, slot);
    }

    let mut blocks = slots.values().map(|slot| (slot.group, slot.binding));
    if let Some(first) = blocks.next() {
        if blocks.any(|block| block != first) {
            problems.push("uniforms must share a single uniform block".to_string());
        }
    }

    if !problems.is_empty() {
        return Err(Diagnostic::new(problems.join("\n")));
    }

    Ok(LinkedInterface {
        vertex_entry: vertex_entry.map(|entry| entry.name.clone()),
        fragment_entry: fragment_entry.map(|entry| entry.name.clone()),
        writes_position,
        fragment_outputs,
        slots,
    })
}

fn validate(interface: &LinkedInterface) -> Result<(), Diagnostic> {
    let mut problems = Vec::new();

    for (stage, entry) in [
        (ShaderStageKind::Vertex, &interface.vertex_entry),
        (ShaderStageKind::Fragment, &interface.fragment_entry),
    ] {
        if entry.as_deref() != Some(ENTRY_POINT) {
            problems.push(format!(
                "{stage} entry point must be named `{ENTRY_POINT}`, found {entry:?}"
            ));
        }
    }
    if !interface.writes_position {
        problems.push("vertex stage never writes gl_Position".to_string());
    }
    if !interface.fragment_outputs.contains_key(&0) {
        problems.push("fragment stage has no colour output at location 0".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Diagnostic::new(problems.join("\n")))
    }
}
