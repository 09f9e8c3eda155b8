//! Render target contract and camera
//!
//! The engine never draws anything itself. A [`RenderTarget`] receives the
//! stage, the mounted scene root and the camera once per frame; what it does
//! with them is up to the backend. [`HeadlessTarget`] is the built-in
//! backend that only records what it was asked to draw.

use super::stage::{NodeKind, Stage, StageError};
use crate::core::config::{CameraConfig, CameraKind};
use crate::foundation::collections::NodeId;
use crate::foundation::math::{utils, Mat4, Point3, Vec3};
use thiserror::Error;

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// Render requested for a root that was never mounted
    #[error("Scene root {0:?} is not mounted on the render target")]
    NotMounted(NodeId),

    /// Stage lookup failed while walking the graph
    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    /// Backend specific failure
    #[error("Render backend error: {0}")]
    Backend(String),
}

/// Scene camera
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Projection kind
    pub kind: CameraKind,
    /// Eye position
    pub position: Vec3,
    /// Look-at point
    pub target: Vec3,
    /// Up direction
    pub up: Vec3,
    /// Vertical field of view in radians (perspective only)
    pub fov_y: f32,
    /// Visible height in world units (orthographic only)
    pub ortho_height: f32,
    /// Width / height
    pub aspect: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl Camera {
    /// Build from configuration
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            kind: config.kind,
            position: Vec3::from(config.position),
            target: Vec3::from(config.target),
            up: Vec3::y(),
            fov_y: utils::deg_to_rad(config.fov_degrees),
            ortho_height: config.ortho_height,
            aspect: config.aspect,
            near: config.near,
            far: config.far,
        }
    }

    /// View matrix (right-handed look-at)
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(
            &Point3::from(self.position),
            &Point3::from(self.target),
            &self.up,
        )
    }

    /// Projection matrix for the camera's kind
    pub fn projection(&self) -> Mat4 {
        match self.kind {
            CameraKind::Perspective => {
                Mat4::new_perspective(self.aspect, self.fov_y, self.near, self.far)
            }
            CameraKind::Orthographic => {
                let half_h = self.ortho_height * 0.5;
                let half_w = half_h * self.aspect;
                Mat4::new_orthographic(-half_w, half_w, -half_h, half_h, self.near, self.far)
            }
        }
    }

    /// Projection times view
    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

/// Backend that draws a mounted stage subtree
pub trait RenderTarget {
    /// Start drawing the subtree under `root`
    fn mount(&mut self, stage: &Stage, root: NodeId) -> Result<(), RenderError>;

    /// Stop drawing `root`; unknown roots are ignored
    fn unmount(&mut self, root: NodeId);

    /// Draw one frame of the subtree under `root`
    fn render(&mut self, stage: &Stage, root: NodeId, camera: &Camera) -> Result<(), RenderError>;

    /// Enable a named post-processing pass
    fn add_render_pass(&mut self, name: &str);

    /// Disable a named pass; unknown names only warn
    fn remove_render_pass(&mut self, name: &str);
}

/// What the last headless frame contained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Nodes walked
    pub nodes: usize,
    /// Visible drawables
    pub drawables: usize,
}

/// Render target without a GPU, used by tests and headless runs
#[derive(Debug, Default)]
pub struct HeadlessTarget {
    mounted: Vec<NodeId>,
    passes: Vec<String>,
    frames: u64,
    last_frame: FrameStats,
}

impl HeadlessTarget {
    /// Create an empty target
    pub fn new() -> Self {
        Self::default()
    }

    /// Roots currently mounted
    pub fn mounted(&self) -> &[NodeId] {
        &self.mounted
    }

    /// Enabled passes in insertion order
    pub fn passes(&self) -> &[String] {
        &self.passes
    }

    /// Frames rendered so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Stats of the most recent frame
    pub fn last_frame(&self) -> FrameStats {
        self.last_frame
    }
}

impl RenderTarget for HeadlessTarget {
    fn mount(&mut self, stage: &Stage, root: NodeId) -> Result<(), RenderError> {
        if !stage.contains(root) {
            return Err(StageError::NodeNotFound(root).into());
        }
        if !self.mounted.contains(&root) {
            self.mounted.push(root);
        }
        Ok(())
    }

    fn unmount(&mut self, root: NodeId) {
        self.mounted.retain(|r| *r != root);
    }

    fn render(&mut self, stage: &Stage, root: NodeId, _camera: &Camera) -> Result<(), RenderError> {
        if !self.mounted.contains(&root) {
            return Err(RenderError::NotMounted(root));
        }
        let mut stats = FrameStats::default();
        stage.traverse(root, |id, node| {
            stats.nodes += 1;
            if matches!(node.kind, NodeKind::Drawable(_)) && stage.is_visible_in_tree(id) {
                stats.drawables += 1;
            }
        })?;
        self.frames += 1;
        self.last_frame = stats;
        log::trace!("Headless frame {}: {stats:?}", self.frames);
        Ok(())
    }

    fn add_render_pass(&mut self, name: &str) {
        if !self.passes.iter().any(|p| p == name) {
            self.passes.push(name.to_string());
        }
    }

    fn remove_render_pass(&mut self, name: &str) {
        match self.passes.iter().position(|p| p == name) {
            Some(index) => {
                self.passes.remove(index);
            }
            None => log::warn!("Render pass '{name}' was never added"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Drawable, Node, Shape};
    use approx::assert_relative_eq;

    #[test]
    fn test_render_requires_mount() {
        let mut stage = Stage::new();
        let root = stage.insert(Node::group(), None).unwrap();
        let mut target = HeadlessTarget::new();

        assert!(matches!(
            target.render(&stage, root, &Camera::default()),
            Err(RenderError::NotMounted(_))
        ));

        target.mount(&stage, root).unwrap();
        target.render(&stage, root, &Camera::default()).unwrap();
        assert_eq!(target.frames(), 1);
    }

    #[test]
    fn test_hidden_drawables_are_not_counted() {
        let mut stage = Stage::new();
        let root = stage.insert(Node::group(), None).unwrap();
        let group = stage.insert(Node::group(), Some(root)).unwrap();
        stage.insert(Node::drawable(Drawable::new(Shape::Sphere(1.0))), Some(root)).unwrap();
        stage.insert(Node::drawable(Drawable::new(Shape::Sphere(1.0))), Some(group)).unwrap();
        stage.get_mut(group).unwrap().visible = false;

        let mut target = HeadlessTarget::new();
        target.mount(&stage, root).unwrap();
        target.render(&stage, root, &Camera::default()).unwrap();

        assert_eq!(target.last_frame(), FrameStats { nodes: 4, drawables: 1 });
    }

    #[test]
    fn test_removing_unknown_pass_is_a_no_op() {
        let mut target = HeadlessTarget::new();
        target.add_render_pass("bloom");
        target.remove_render_pass("outline");
        assert_eq!(target.passes(), ["bloom".to_string()]);
        target.remove_render_pass("bloom");
        assert!(target.passes().is_empty());
    }

    #[test]
    fn test_orthographic_projection_maps_height() {
        let mut config = CameraConfig::new(CameraKind::Orthographic);
        config.ortho_height = 4.0;
        config.aspect = 2.0;
        let camera = Camera::from_config(&config);
        let projection = camera.projection();

        assert_relative_eq!(projection.m11, 1.0 / 4.0);
        assert_relative_eq!(projection.m22, 1.0 / 2.0);
    }
}
