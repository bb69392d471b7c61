//! Capability records attached to nodes
//!
//! The scene graph treats components as opaque data. Property editors draw
//! them generically from [`Component::schema`], which lists each editable
//! field with its kind and bounds, and write back through
//! [`Component::set_field`].

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;

/// Built-in mesh primitives the editor can create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    /// Axis-aligned box
    Box {
        /// Size along X
        width: f32,
        /// Size along Y
        height: f32,
        /// Size along Z
        depth: f32,
    },
    /// UV sphere
    Sphere {
        /// Radius
        radius: f32,
        /// Latitude/longitude band count
        divisions: u32,
    },
    /// Single quad in the XY plane
    Quad {
        /// Size along X
        width: f32,
        /// Size along Y
        height: f32,
    },
}

impl Primitive {
    /// Unit box
    pub const fn unit_box() -> Self {
        Self::Box { width: 1.0, height: 1.0, depth: 1.0 }
    }

    /// Unit sphere with the given band count, clamped to the editor's 10..=100 range
    pub fn sphere(divisions: u32) -> Self {
        Self::Sphere { radius: 1.0, divisions: divisions.clamp(10, 100) }
    }

    /// Display name used for default node names
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Box { .. } => "Box",
            Self::Sphere { .. } => "Sphere",
            Self::Quad { .. } => "Quad",
        }
    }
}

/// Mesh capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshComponent {
    /// Geometry source
    pub primitive: Primitive,
    /// Material name, resolved by the renderer
    pub material: String,
}

impl MeshComponent {
    /// Mesh with the default material
    pub fn new(primitive: Primitive) -> Self {
        Self {
            primitive,
            material: "defaultMat".to_string(),
        }
    }
}

/// Light emission model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightType {
    /// Omnidirectional
    Point,
    /// Parallel rays
    Directional,
    /// Cone
    Spot,
}

/// Light attenuation curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightFalloff {
    /// No attenuation
    Constant,
    /// 1/d
    Linear,
    /// 1/d²
    Quadratic,
}

/// Light capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightComponent {
    /// Emission model
    pub light_type: LightType,
    /// Attenuation curve
    pub falloff: LightFalloff,
    /// Intensity multiplier
    pub intensity: f32,
    /// Cone angle in degrees for spot lights
    pub fov: f32,
    /// Linear RGB color
    pub color: Vec3,
    /// Whether the light contributes to rendering
    pub is_renderable: bool,
}

impl Default for LightComponent {
    fn default() -> Self {
        Self {
            light_type: LightType::Point,
            falloff: LightFalloff::Quadratic,
            intensity: 200.0,
            fov: 360.0,
            color: Vec3::new(1.0, 1.0, 1.0),
            is_renderable: true,
        }
    }
}

/// Script capability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptComponent {
    /// Path to the script source
    pub path: String,
}

/// Collision volume kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionShape {
    /// Box volume
    Box,
    /// Sphere volume
    Sphere,
    /// Capsule volume
    Capsule,
    /// Mesh-derived volume
    Mesh,
}

/// Collision capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionComponent {
    /// Volume kind
    pub shape: CollisionShape,
}

/// Attached capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Component {
    /// Renderable geometry
    Mesh(MeshComponent),
    /// Light source
    Light(LightComponent),
    /// Attached script
    Script(ScriptComponent),
    /// Collision volume
    Collision(CollisionComponent),
}

/// Editing widget hint for a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Floating point value with inclusive bounds and drag speed
    Float {
        /// Lower bound
        min: f32,
        /// Upper bound
        max: f32,
        /// Drag speed per pixel
        speed: f32,
    },
    /// Integer value with inclusive bounds
    Int {
        /// Lower bound
        min: i64,
        /// Upper bound
        max: i64,
    },
    /// Checkbox
    Bool,
    /// Single-line text with a length limit
    Text {
        /// Maximum length in bytes
        max_len: usize,
    },
    /// RGB color picker
    Color,
}

/// One editable field of a component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSchema {
    /// Field key used with [`Component::field`] and [`Component::set_field`]
    pub name: &'static str,
    /// Label shown by the property editor
    pub label: &'static str,
    /// Widget hint and bounds
    pub kind: FieldKind,
    /// Displayed but not editable
    pub read_only: bool,
}

impl FieldSchema {
    const fn editable(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self { name, label, kind, read_only: false }
    }

    const fn read_only(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self { name, label, kind, read_only: true }
    }
}

/// A field value as exchanged with the property editor
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Float field
    Float(f32),
    /// Integer field
    Int(i64),
    /// Checkbox field
    Bool(bool),
    /// Text field
    Text(String),
    /// Color field
    Color(Vec3),
}

/// Field access errors
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// The component has no such field
    #[error("{component} has no field '{field}'")]
    UnknownField {
        /// Component kind name
        component: &'static str,
        /// Requested field
        field: String,
    },

    /// Value variant does not match the field kind
    #[error("field '{field}' expects a {expected} value")]
    TypeMismatch {
        /// Field name
        field: &'static str,
        /// Expected value kind
        expected: &'static str,
    },

    /// The field cannot be edited
    #[error("field '{0}' is read-only")]
    ReadOnly(&'static str),
}

const MESH_FIELDS: &[FieldSchema] = &[
    FieldSchema::read_only("primitive", "Primitive", FieldKind::Text { max_len: 32 }),
    FieldSchema::editable("material", "Material", FieldKind::Text { max_len: 64 }),
];

const LIGHT_FIELDS: &[FieldSchema] = &[
    FieldSchema::editable(
        "intensity",
        "Intensity",
        FieldKind::Float { min: 0.0, max: 100_000.0, speed: 1.0 },
    ),
    FieldSchema::editable("fov", "FOV", FieldKind::Float { min: 0.0, max: 360.0, speed: 0.5 }),
    FieldSchema::editable("is_renderable", "IsRenderable", FieldKind::Bool),
    FieldSchema::read_only("falloff", "FallOff", FieldKind::Text { max_len: 16 }),
    FieldSchema::editable("color", "Color", FieldKind::Color),
];

const SCRIPT_FIELDS: &[FieldSchema] = &[FieldSchema::editable(
    "path",
    "Script Path",
    FieldKind::Text { max_len: 260 },
)];

const COLLISION_FIELDS: &[FieldSchema] = &[FieldSchema::read_only(
    "shape",
    "CollisionType",
    FieldKind::Text { max_len: 16 },
)];

impl Component {
    /// Kind name shown as the component header
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Mesh(_) => "Mesh",
            Self::Light(_) => "Light",
            Self::Script(_) => "Script",
            Self::Collision(_) => "Collision",
        }
    }

    /// Editable field list
    pub const fn schema(&self) -> &'static [FieldSchema] {
        match self {
            Self::Mesh(_) => MESH_FIELDS,
            Self::Light(_) => LIGHT_FIELDS,
            Self::Script(_) => SCRIPT_FIELDS,
            Self::Collision(_) => COLLISION_FIELDS,
        }
    }

    /// Read a field by name
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match (self, name) {
            (Self::Mesh(mesh), "primitive") => FieldValue::Text(mesh.primitive.label().to_string()),
            (Self::Mesh(mesh), "material") => FieldValue::Text(mesh.material.clone()),
            (Self::Light(light), "intensity") => FieldValue::Float(light.intensity),
            (Self::Light(light), "fov") => FieldValue::Float(light.fov),
            (Self::Light(light), "is_renderable") => FieldValue::Bool(light.is_renderable),
            (Self::Light(light), "falloff") => FieldValue::Text(format!("{:?}", light.falloff)),
            (Self::Light(light), "color") => FieldValue::Color(light.color),
            (Self::Script(script), "path") => FieldValue::Text(script.path.clone()),
            (Self::Collision(collision), "shape") => FieldValue::Text(format!("{:?}", collision.shape)),
            _ => return None,
        };
        Some(value)
    }

    /// Write a field by name
    ///
    /// Float values are clamped to the schema bounds and text is truncated
    /// to the schema length, the way the editor widgets limit input.
    pub fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        let kind_name = self.kind_name();
        let schema = self
            .schema()
            .iter()
            .find(|field| field.name == name)
            .ok_or_else(|| FieldError::UnknownField {
                component: kind_name,
                field: name.to_string(),
            })?;
        if schema.read_only {
            return Err(FieldError::ReadOnly(schema.name));
        }

        match (self, schema.kind, value) {
            (Self::Mesh(mesh), FieldKind::Text { max_len }, FieldValue::Text(text)) => {
                mesh.material = truncate(text, max_len);
            }
            (Self::Light(light), FieldKind::Float { min, max, .. }, FieldValue::Float(v)) => {
                let v = v.clamp(min, max);
                match schema.name {
                    "intensity" => light.intensity = v,
                    _ => light.fov = v,
                }
            }
            (Self::Light(light), FieldKind::Bool, FieldValue::Bool(v)) => light.is_renderable = v,
            (Self::Light(light), FieldKind::Color, FieldValue::Color(v)) => {
                light.color = v.map(|c| c.clamp(0.0, 1.0));
            }
            (Self::Script(script), FieldKind::Text { max_len }, FieldValue::Text(text)) => {
                script.path = truncate(text, max_len);
            }
            (_, kind, _) => {
                return Err(FieldError::TypeMismatch {
                    field: schema.name,
                    expected: kind_label(kind),
                })
            }
        }
        Ok(())
    }
}

const fn kind_label(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Float { .. } => "float",
        FieldKind::Int { .. } => "integer",
        FieldKind::Bool => "bool",
        FieldKind::Text { .. } => "text",
        FieldKind::Color => "color",
    }
}

fn truncate(mut text: String, max_len: usize) -> String {
    if text.len() > max_len {
        let mut cut = max_len;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_fields_are_readable() {
        let components = [
            Component::Mesh(MeshComponent::new(Primitive::unit_box())),
            Component::Light(LightComponent::default()),
            Component::Script(ScriptComponent::default()),
            Component::Collision(CollisionComponent { shape: CollisionShape::Sphere }),
        ];

        for component in &components {
            for field in component.schema() {
                assert!(
                    component.field(field.name).is_some(),
                    "{} does not expose {}",
                    component.kind_name(),
                    field.name
                );
            }
        }
    }

    #[test]
    fn test_light_fields_clamp() {
        let mut light = Component::Light(LightComponent::default());

        light.set_field("fov", FieldValue::Float(720.0)).unwrap();
        assert_eq!(light.field("fov"), Some(FieldValue::Float(360.0)));

        light.set_field("color", FieldValue::Color(Vec3::new(2.0, 0.5, -1.0))).unwrap();
        assert_eq!(light.field("color"), Some(FieldValue::Color(Vec3::new(1.0, 0.5, 0.0))));
    }

    #[test]
    fn test_set_field_errors() {
        let mut light = Component::Light(LightComponent::default());

        assert!(matches!(
            light.set_field("range", FieldValue::Float(1.0)),
            Err(FieldError::UnknownField { .. })
        ));
        assert_eq!(
            light.set_field("falloff", FieldValue::Text("Linear".into())),
            Err(FieldError::ReadOnly("falloff"))
        );
        assert_eq!(
            light.set_field("intensity", FieldValue::Bool(true)),
            Err(FieldError::TypeMismatch { field: "intensity", expected: "float" })
        );
    }

    #[test]
    fn test_script_path_truncated() {
        let mut script = Component::Script(ScriptComponent::default());
        script.set_field("path", FieldValue::Text("x".repeat(300))).unwrap();

        match script.field("path") {
            Some(FieldValue::Text(path)) => assert_eq!(path.len(), 260),
            other => panic!("unexpected field value {other:?}"),
        }
    }

    #[test]
    fn test_sphere_divisions_clamped() {
        assert_eq!(Primitive::sphere(3), Primitive::Sphere { radius: 1.0, divisions: 10 });
        assert_eq!(Primitive::sphere(500), Primitive::Sphere { radius: 1.0, divisions: 100 });
    }
}
