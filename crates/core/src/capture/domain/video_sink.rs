use crate::capture::domain::camera::CameraStream;
use crate::shared::frame::Frame;

/// Where the acquired stream is attached so the detection loop can pull
/// frames from it.
#[derive(Default)]
pub struct VideoSink {
    stream: Option<Box<dyn CameraStream>>,
}

impl VideoSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, stream: Box<dyn CameraStream>) {
        self.stream = Some(stream);
    }

    pub fn detach(&mut self) -> Option<Box<dyn CameraStream>> {
        self.stream.take()
    }

    pub fn is_attached(&self) -> bool {
        self.stream.is_some()
    }

    /// Whether the attached stream is still delivering. `false` when
    /// nothing is attached.
    pub fn is_active(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| s.is_active())
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.stream.as_ref().map(|s| s.dimensions())
    }

    /// The current frame, but only once the stream has buffered one with a
    /// usable size.
    pub fn ready_frame(&self) -> Option<Frame> {
        let stream = self.stream.as_ref()?;
        if !stream.is_active() {
            return None;
        }
        stream.latest_frame().filter(|f| !f.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StillStream {
        frame: Option<Frame>,
        active: bool,
    }

    impl CameraStream for StillStream {
        fn dimensions(&self) -> (u32, u32) {
            (320, 240)
        }

        fn latest_frame(&self) -> Option<Frame> {
            self.frame.clone()
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn stop(&mut self) {
            self.active = false;
        }
    }

    #[test]
    fn test_empty_sink_has_no_frame() {
        let sink = VideoSink::new();
        assert!(!sink.is_attached());
        assert!(sink.ready_frame().is_none());
        assert!(sink.dimensions().is_none());
    }

    #[test]
    fn test_attached_stream_without_frames_is_not_ready() {
        let mut sink = VideoSink::new();
        sink.attach(Box::new(StillStream {
            frame: None,
            active: true,
        }));
        assert_eq!(sink.dimensions(), Some((320, 240)));
        assert!(sink.ready_frame().is_none());
    }

    #[test]
    fn test_ready_frame_requires_active_stream() {
        let mut sink = VideoSink::new();
        sink.attach(Box::new(StillStream {
            frame: Some(Frame::filled(4, 4, [1, 2, 3])),
            active: false,
        }));
        assert!(sink.ready_frame().is_none());
        assert!(sink.is_attached());
        assert!(!sink.is_active());
    }

    #[test]
    fn test_detach_returns_stream() {
        let mut sink = VideoSink::new();
        sink.attach(Box::new(StillStream {
            frame: Some(Frame::filled(4, 4, [1, 2, 3])),
            active: true,
        }));
        assert!(sink.ready_frame().is_some());
        assert!(sink.is_active());
        assert!(sink.detach().is_some());
        assert!(!sink.is_active());
        assert!(!sink.is_attached());
    }
}
