use std::borrow::Cow;
use std::collections::BTreeMap;

use super::error::ShaderError;
use super::layout;
use super::sources::ShaderSources;
use super::stage::{CompileStatus, CompiledStage, StageKind};

/// A linked vertex + fragment pair.
///
/// The stage objects are consumed by [`ShaderProgram::link`]; the program keeps
/// only the validated modules and their entry point names.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    vertex: naga::Module,
    vertex_entry: String,
    fragment: naga::Module,
    fragment_entry: String,
}

impl ShaderProgram {
    /// Compiles both stages of `sources` and links them.
    ///
    /// Both stages are always compiled (and their failures logged) before the
    /// link step reports the first failure.
    pub fn build(sources: &ShaderSources) -> Result<Self, ShaderError> {
        let vertex = CompiledStage::compile(&sources.vertex, StageKind::Vertex);
        let fragment = CompiledStage::compile(&sources.fragment, StageKind::Fragment);
        Self::link(vertex, fragment)
    }

    /// Links two compiled stages and checks the link status.
    ///
    /// Fails when a stage did not compile, is of the wrong kind or lacks an
    /// entry point, when the stage interface does not match (every fragment
    /// input must be written by the vertex stage with the same type and
    /// interpolation), or when either stage uses a vertex input, colour output
    /// or resource binding the renderer does not provide.
    pub fn link(vertex: CompiledStage, fragment: CompiledStage) -> Result<Self, ShaderError> {
        for (stage, expected) in [(&vertex, StageKind::Vertex), (&fragment, StageKind::Fragment)] {
            if stage.kind() != expected {
                return Err(link_error(format!(
                    "expected a {expected} stage, got a {} stage",
                    stage.kind()
                )));
            }
            if let CompileStatus::Failed(log) = stage.status() {
                return Err(ShaderError::Compile {
                    stage: expected,
                    log: log.clone(),
                });
            }
        }

        let (Some(vertex), Some(fragment)) = (vertex.into_module(), fragment.into_module()) else {
            return Err(link_error("compiled stage carries no module"));
        };

        let vertex_ep = entry_point(&vertex, StageKind::Vertex)?;
        let fragment_ep = entry_point(&fragment, StageKind::Fragment)?;

        check_resources(&vertex, StageKind::Vertex)?;
        check_resources(&fragment, StageKind::Fragment)?;

        let attributes = inputs(&vertex, vertex_ep);
        check_float_locations(&attributes, layout::POSITION_LOCATION, "vertex input")?;
        let targets = outputs(&fragment, fragment_ep);
        check_float_locations(&targets, layout::COLOR_LOCATION, "fragment output")?;

        let written = outputs(&vertex, vertex_ep);
        let read = inputs(&fragment, fragment_ep);
        check_interface(&written, &read)?;

        let vertex_entry = vertex_ep.name.clone();
        let fragment_entry = fragment_ep.name.clone();
        log::info!("shader program linked ({} interface location(s))", read.len());

        Ok(Self {
            vertex,
            vertex_entry,
            fragment,
            fragment_entry,
        })
    }

    #[inline]
    pub fn vertex_entry(&self) -> &str {
        &self.vertex_entry
    }

    #[inline]
    pub fn fragment_entry(&self) -> &str {
        &self.fragment_entry
    }

    /// Creates the GPU shader modules `(vertex, fragment)`.
    pub(crate) fn create_modules(
        &self,
        device: &wgpu::Device,
    ) -> (wgpu::ShaderModule, wgpu::ShaderModule) {
        let vs = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quadgrid vertex shader"),
            source: wgpu::ShaderSource::Naga(Cow::Owned(self.vertex.clone())),
        });
        let fs = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quadgrid fragment shader"),
            source: wgpu::ShaderSource::Naga(Cow::Owned(self.fragment.clone())),
        });
        (vs, fs)
    }
}

fn link_error(log: impl Into<String>) -> ShaderError {
    ShaderError::Link { log: log.into() }
}

fn entry_point(module: &naga::Module, kind: StageKind) -> Result<&naga::EntryPoint, ShaderError> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.stage == kind.to_naga())
        .ok_or_else(|| link_error(format!("{kind} stage has no {kind} entry point")))
}

/// A user-defined stage input or output.
#[derive(Debug, Clone, PartialEq)]
struct Varying {
    ty: naga::TypeInner,
    interpolation: naga::Interpolation,
    sampling: naga::Sampling,
}

type Varyings = BTreeMap<u32, Varying>;

fn outputs(module: &naga::Module, ep: &naga::EntryPoint) -> Varyings {
    let mut out = Varyings::new();
    if let Some(result) = &ep.function.result {
        collect_locations(module, result.ty, result.binding.as_ref(), &mut out);
    }
    out
}

fn inputs(module: &naga::Module, ep: &naga::EntryPoint) -> Varyings {
    let mut out = Varyings::new();
    for arg in &ep.function.arguments {
        collect_locations(module, arg.ty, arg.binding.as_ref(), &mut out);
    }
    out
}

/// Collects user locations; unbound structs are searched member by member.
/// Unqualified floats interpolate perspective-correct at the pixel centre.
fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Varyings,
) {
    match binding {
        Some(naga::Binding::Location {
            location,
            interpolation,
            sampling,
            ..
        }) => {
            let inner = module.types[ty].inner.clone();
            let default_interpolation = match inner.scalar_kind() {
                Some(naga::ScalarKind::Float) | None => naga::Interpolation::Perspective,
                Some(_) => naga::Interpolation::Flat,
            };
            out.insert(
                *location,
                Varying {
                    ty: inner,
                    interpolation: interpolation.unwrap_or(default_interpolation),
                    sampling: sampling.unwrap_or(naga::Sampling::Center),
                },
            );
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

/// Every location read by the fragment stage is written by the vertex stage
/// with the same type, interpolation and sampling.
fn check_interface(written: &Varyings, read: &Varyings) -> Result<(), ShaderError> {
    let missing: Vec<String> = read
        .keys()
        .filter(|loc| !written.contains_key(loc))
        .map(u32::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(link_error(format!(
            "fragment input location(s) {} not written by the vertex stage",
            missing.join(", ")
        )));
    }

    for (location, input) in read {
        let output = &written[location];
        if output.ty != input.ty {
            return Err(link_error(format!(
                "location {location}: vertex stage writes {:?}, fragment stage reads {:?}",
                output.ty, input.ty
            )));
        }
        if (output.interpolation, output.sampling) != (input.interpolation, input.sampling) {
            return Err(link_error(format!(
                "location {location}: interpolation differs between stages \
                 ({:?}/{:?} vs {:?}/{:?})",
                output.interpolation, output.sampling, input.interpolation, input.sampling
            )));
        }
    }
    Ok(())
}

/// `varyings` may only use `location`, with a float scalar or vector.
fn check_float_locations(
    varyings: &Varyings,
    location: u32,
    what: &str,
) -> Result<(), ShaderError> {
    for (loc, varying) in varyings {
        if *loc != location {
            return Err(link_error(format!(
                "{what} location {loc} is not bound; only location {location} is"
            )));
        }
        let shaped = matches!(
            varying.ty,
            naga::TypeInner::Scalar(_) | naga::TypeInner::Vector { .. }
        );
        let float = shaped && varying.ty.scalar_kind() == Some(naga::ScalarKind::Float);
        if !float {
            return Err(link_error(format!(
                "{what} location {loc} must be a float scalar or vector, found {:?}",
                varying.ty
            )));
        }
    }
    Ok(())
}

/// Every bound resource must be one of the renderer's uniform blocks and fit
/// in the bytes bound for it.
fn check_resources(module: &naga::Module, kind: StageKind) -> Result<(), ShaderError> {
    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else { continue };
        let name = var.name.as_deref().unwrap_or("<unnamed>");

        let Some(slot) = layout::uniform_slot(binding.group, binding.binding) else {
            return Err(link_error(format!(
                "{kind} stage binds `{name}` at set {} binding {}, \
                 which the renderer does not provide",
                binding.group, binding.binding
            )));
        };
        if var.space != naga::AddressSpace::Uniform {
            return Err(link_error(format!(
                "{kind} stage binds `{name}` at set {} binding {} as {:?}, \
                 expected a uniform block",
                slot.group, slot.binding, var.space
            )));
        }
        let size = module.types[var.ty].inner.size(module.to_ctx());
        if size > slot.size {
            return Err(link_error(format!(
                "{kind} stage block `{name}` is {size} bytes, set {} binding {} binds {}",
                slot.group, slot.binding, slot.size
            )));
        }
    }
    Ok(())
}
