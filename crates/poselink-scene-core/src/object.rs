//! Scene objects: the transforms a host scene owns.

use crate::math::{Mat4, Trs};
use crate::ports::{Axis, Channel, Source};
use crate::value::Value;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// A user-defined attribute on an object: a stored value plus an optional
/// preserved upstream connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomAttr {
    pub value: Value,
    pub connection: Option<Source>,
}

impl CustomAttr {
    pub fn value(value: Value) -> CustomAttr {
        CustomAttr {
            value,
            connection: None,
        }
    }
}

/// An opaque host transform. The constraint core never creates or destroys
/// these; it only reads and writes specific attributes.
#[derive(Clone, Debug)]
pub struct SceneObject {
    pub name: String,
    pub parent: Option<String>,
    pub is_joint: bool,

    // Raw channel values.
    pub translate: [f32; 3],
    pub rotate: [f32; 3],
    pub scale: [f32; 3],
    pub shear: [f32; 3],
    pub joint_orient: [f32; 3],

    /// Live connections driving individual raw channel components.
    pub channel_inputs: HashMap<(Channel, Axis), Source>,

    /// The local-offset sink: stored constant plus optional live connection.
    /// A live connection overrides the constant.
    pub offset_parent: Mat4,
    pub offset_parent_input: Option<Source>,

    pub custom: HashMap<String, CustomAttr>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>) -> SceneObject {
        SceneObject {
            name: name.into(),
            parent: None,
            is_joint: false,
            translate: [0.0; 3],
            rotate: [0.0; 3],
            scale: [1.0; 3],
            shear: [0.0; 3],
            joint_orient: [0.0; 3],
            channel_inputs: HashMap::new(),
            offset_parent: Mat4::IDENTITY,
            offset_parent_input: None,
            custom: HashMap::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> SceneObject {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_translate(mut self, t: [f32; 3]) -> SceneObject {
        self.translate = t;
        self
    }

    pub fn with_rotate(mut self, r: [f32; 3]) -> SceneObject {
        self.rotate = r;
        self
    }

    pub fn channel(&self, channel: Channel, axis: Axis) -> f32 {
        let i = axis.index();
        match channel {
            Channel::Translate => self.translate[i],
            Channel::Rotate => self.rotate[i],
            Channel::Scale => self.scale[i],
            Channel::Shear => self.shear[i],
        }
    }

    pub fn set_channel(&mut self, channel: Channel, axis: Axis, value: f32) {
        let i = axis.index();
        match channel {
            Channel::Translate => self.translate[i] = value,
            Channel::Rotate => self.rotate[i] = value,
            Channel::Scale => self.scale[i] = value,
            Channel::Shear => self.shear[i] = value,
        }
    }

    /// Raw channels as a Trs, ignoring live channel connections.
    pub fn local_trs(&self) -> Trs {
        Trs {
            translate: self.translate,
            rotate: self.rotate,
            scale: self.scale,
            shear: self.shear,
        }
    }

    /// Reset raw channels to identity. Joint orient is included for joints so
    /// the local-offset sink fully encodes the transform afterwards.
    pub fn reset_identity(&mut self) {
        self.translate = [0.0; 3];
        self.rotate = [0.0; 3];
        self.scale = [1.0; 3];
        self.shear = [0.0; 3];
        if self.is_joint {
            self.joint_orient = [0.0; 3];
        }
    }
}
