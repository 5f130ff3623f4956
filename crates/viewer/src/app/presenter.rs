use std::sync::Arc;

use isomap::FrameBuffer;
use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

pub(crate) struct Presenter {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    width: u32,
    height: u32,
    presented_generation: Option<u64>,
}

impl Presenter {
    pub(crate) fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            width: size.width,
            height: size.height,
            presented_generation: None,
        })
    }

    pub(crate) fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.width = width;
        self.height = height;
        self.presented_generation = None;
        Ok(())
    }

    fn build_pixels(window: Arc<Window>, width: u32, height: u32) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn upload(&mut self, frame: &FrameBuffer, generation: u64) {
        let same_size = frame.width() == self.width && frame.height() == self.height;
        if same_size && self.presented_generation != Some(generation) {
            self.pixels.frame_mut().copy_from_slice(frame.rgba());
            self.presented_generation = Some(generation);
        }
    }

    pub(crate) fn render(&self) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }
        self.pixels.render()
    }
}
