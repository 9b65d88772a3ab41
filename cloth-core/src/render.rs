//! The boundary between the simulation and whatever draws it.
//!
//! The core never talks to a graphics API. It exposes its output through
//! [`SurfaceSource`] and hands a borrowed [`ClothFrame`] to a [`Renderer`]
//! once per tick, after all substeps and the normal update have finished.

use crate::simulation::FrameReport;

/// Anything that can supply flattened cloth geometry.
pub trait SurfaceSource {
    /// Vertex positions, `[x0, y0, z0, x1, ...]`.
    fn positions(&self) -> &[f32];
    /// Vertex normals, same layout as [`SurfaceSource::positions`].
    fn normals(&self) -> &[f32];
    /// Triangle list, three vertex indices per triangle.
    fn triangles(&self) -> &[u32];
}

/// A read-only snapshot of one tick's output.
#[derive(Clone, Copy, Debug)]
pub struct ClothFrame<'a> {
    pub positions: &'a [f32],
    pub normals: &'a [f32],
    pub triangles: &'a [u32],
    pub report: FrameReport,
}

impl<'a> ClothFrame<'a> {
    pub fn from_source<S: SurfaceSource + ?Sized>(source: &'a S, report: FrameReport) -> Self {
        Self {
            positions: source.positions(),
            normals: source.normals(),
            triangles: source.triangles(),
            report,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }
}

/// Consumer of simulation output.
pub trait Renderer {
    /// Called once per tick with a stable snapshot.
    fn present(&mut self, frame: &ClothFrame<'_>);
}

/// Discards every frame.
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn present(&mut self, _frame: &ClothFrame<'_>) {}
}

/// Owned copy of a presented frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordedFrame {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub triangle_count: usize,
    pub report: FrameReport,
}

/// Keeps a copy of every presented frame.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    pub frames: Vec<RecordedFrame>,
}

impl FrameRecorder {
    pub fn last(&self) -> Option<&RecordedFrame> {
        self.frames.last()
    }
}

impl Renderer for FrameRecorder {
    fn present(&mut self, frame: &ClothFrame<'_>) {
        self.frames.push(RecordedFrame {
            positions: frame.positions.to_vec(),
            normals: frame.normals.to_vec(),
            triangle_count: frame.triangle_count(),
            report: frame.report,
        });
    }
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn present(&mut self, frame: &ClothFrame<'_>) {
        (**self).present(frame);
    }
}
