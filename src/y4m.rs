//! Minimal Y4M writer for the `vp8dump` CLI: writes an already-cropped
//! `FrameBuffer` straight to a `Write` sink.

use std::io::prelude::*;

use crate::emit::FrameBuffer;

const Y4M_FILE_MAGIC: &str = "YUV4MPEG2 ";
const Y4M_FRAME_MAGIC: &str = "FRAME";

pub struct Y4MWriter<W> {
    inner: W,
    width: usize,
    height: usize,
}

impl<W: Write> Y4MWriter<W> {
    pub fn new(mut inner: W, width: usize, height: usize) -> std::io::Result<Self> {
        inner.write_all(Y4M_FILE_MAGIC.as_bytes())?;
        write!(inner, "W{} H{} F25:1 Ip A1:1 C420jpeg\n", width, height)?;
        Ok(Y4MWriter {
            inner,
            width,
            height,
        })
    }

    pub fn write_frame(&mut self, frame: &FrameBuffer) -> std::io::Result<()> {
        assert_eq!(frame.width, self.width);
        assert_eq!(frame.height, self.height);

        self.inner.write_all(Y4M_FRAME_MAGIC.as_bytes())?;
        self.inner.write_all(b"\n")?;
        self.inner.write_all(&frame.y)?;
        self.inner.write_all(&frame.u)?;
        self.inner.write_all(&frame.v)?;
        Ok(())
    }
}
