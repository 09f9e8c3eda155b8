//! 2D sprite render proxy
//!
//! Same node lifecycle as the mesh proxy, drawing a textured quad. Texture
//! and size changes are written into the node on the next step.

use super::{insert_proxy, release_proxy, set_proxy_visible};
use crate::ecs::{Component, ComponentContext, ComponentId, EcsError, System};
use crate::foundation::collections::NodeId;
use crate::scene::{Drawable, NodeKind, Shape};

/// Render proxy that puts a sprite on the stage for its entity
#[derive(Debug, Clone)]
pub struct SpriteComponent {
    texture: String,
    width: f32,
    height: f32,
    color: [f32; 4],
    node: Option<NodeId>,
    dirty: bool,
}

impl SpriteComponent {
    /// Unit-sized sprite showing the texture stored under `texture`
    pub fn new(texture: impl Into<String>) -> Self {
        Self {
            texture: texture.into(),
            width: 1.0,
            height: 1.0,
            color: [1.0, 1.0, 1.0, 1.0],
            node: None,
            dirty: false,
        }
    }

    /// Builder: size in stage units
    #[must_use]
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Builder: tint
    #[must_use]
    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    /// Asset key of the current texture
    pub fn texture(&self) -> &str {
        &self.texture
    }

    /// Swap the texture
    pub fn set_texture(&mut self, texture: impl Into<String>) {
        self.texture = texture.into();
        self.dirty = true;
    }

    /// Width and height in stage units
    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Resize the quad
    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.dirty = true;
    }

    /// Drawable node created on awake
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// What gets drawn
    pub fn drawable(&self) -> Drawable {
        Drawable::new(Shape::Sprite {
            texture: self.texture.clone(),
            width: self.width,
            height: self.height,
        })
        .with_color(self.color)
    }
}

impl Component for SpriteComponent {
    const ID: ComponentId = ComponentId::new("SpriteComponent");
    type System = SpriteSystem;

    fn on_detach(&mut self, ctx: &mut ComponentContext<'_>) {
        release_proxy(ctx, &mut self.node);
    }
}

/// Creates, updates, hides and removes sprite nodes
pub struct SpriteSystem;

impl System<SpriteComponent> for SpriteSystem {
    fn on_awake(component: &mut SpriteComponent, ctx: &mut ComponentContext<'_>) {
        component.node = insert_proxy(ctx, component.drawable(), "sprite");
    }

    fn on_step(
        _dt: f32,
        component: &mut SpriteComponent,
        ctx: &mut ComponentContext<'_>,
    ) -> Result<(), EcsError> {
        if !component.dirty {
            return Ok(());
        }
        if let Some(id) = component.node {
            let drawable = component.drawable();
            if let Some(node) = ctx.stage_mut().get_mut(id) {
                node.kind = NodeKind::Drawable(drawable);
            }
        }
        component.dirty = false;
        Ok(())
    }

    fn on_destroy(component: &mut SpriteComponent, ctx: &mut ComponentContext<'_>) {
        release_proxy(ctx, &mut component.node);
    }

    fn on_enable(component: &mut SpriteComponent, ctx: &mut ComponentContext<'_>) {
        set_proxy_visible(ctx, component.node, true);
    }

    fn on_disable(component: &mut SpriteComponent, ctx: &mut ComponentContext<'_>) {
        set_proxy_visible(ctx, component.node, false);
    }
}
