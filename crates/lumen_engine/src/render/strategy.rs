//! Draw strategies
//!
//! Renderables hand their meshes to the engine's strategy instead of drawing
//! directly, so a whole frame can switch between solid and wireframe output.

use std::fmt::Debug;

use crate::graphics::api::PolygonMode;
use crate::graphics::DataBinder;
use crate::render::RenderResult;
use crate::resources::Mesh;

/// How meshes are drawn
pub trait DrawStrategy: Debug {
    /// Draw a mesh with the currently bound shader
    fn draw(&self, binder: &mut DataBinder, mesh: &Mesh) -> RenderResult<()>;
}

/// Filled triangles
#[derive(Debug, Default, Clone, Copy)]
pub struct SolidDraw;

impl DrawStrategy for SolidDraw {
    fn draw(&self, binder: &mut DataBinder, mesh: &Mesh) -> RenderResult<()> {
        binder.draw(mesh)?;
        Ok(())
    }
}

/// Triangle edges only; the previous polygon mode is restored after each draw
#[derive(Debug, Default, Clone, Copy)]
pub struct WireframeDraw;

impl DrawStrategy for WireframeDraw {
    fn draw(&self, binder: &mut DataBinder, mesh: &Mesh) -> RenderResult<()> {
        let previous = binder.state().polygon_mode();
        if previous != PolygonMode::Line {
            binder.state_mut().set_polygon_mode(PolygonMode::Line)?;
        }

        let result = binder.draw(mesh);

        if previous != PolygonMode::Line {
            binder.state_mut().set_polygon_mode(previous)?;
        }
        result?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StateConfig;
    use crate::graphics::{ApiCall, GraphicsState, HeadlessApi};
    use crate::resources::MeshData;

    fn binder(strict: bool) -> (DataBinder, crate::graphics::CallLog) {
        let api = HeadlessApi::new();
        let log = api.call_log();
        let state = GraphicsState::new(Box::new(api), &StateConfig { strict });
        (DataBinder::new(state), log)
    }

    #[test]
    fn test_wireframe_restores_polygon_mode() {
        let (mut binder, log) = binder(true);
        let mesh = Mesh::new(MeshData::quad());

        WireframeDraw.draw(&mut binder, &mesh).unwrap();

        let line = log.position(&ApiCall::PolygonMode(PolygonMode::Line)).unwrap();
        let draw = log
            .position_where(|c| matches!(c, ApiCall::DrawElements { .. }))
            .unwrap();
        let fill = log.position(&ApiCall::PolygonMode(PolygonMode::Fill)).unwrap();
        assert!(line < draw && draw < fill);
        assert_eq!(binder.state().polygon_mode(), PolygonMode::Fill);
    }

    #[test]
    fn test_solid_draw_leaves_polygon_mode_alone() {
        let (mut binder, log) = binder(true);
        let mesh = Mesh::new(MeshData::quad());

        SolidDraw.draw(&mut binder, &mesh).unwrap();

        assert_eq!(log.count(|c| matches!(c, ApiCall::PolygonMode(_))), 0);
        assert_eq!(log.count(|c| matches!(c, ApiCall::DrawElements { .. })), 1);
    }
}
