//! Orchestration core for live webcam face annotation.
//!
//! A [`pipeline::session::Session`] owns the state store, the one-shot model
//! loader, the webcam controller and the self-rescheduling detection loop.
//! The engine, camera and drawing surface sit behind traits, with ONNX
//! Runtime, ffmpeg and `image` adapters provided.

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod geometry;
    pub mod resource_location;
}

pub mod state {
    pub mod action;
    pub mod application_state;
    pub mod store;
}

pub mod detection {
    pub mod domain {
        pub mod face_engine;
        pub mod face_matcher;
        pub mod face_observation;
    }
    pub mod infrastructure;
}

pub mod capture {
    pub mod domain {
        pub mod camera;
        pub mod video_sink;
    }
    pub mod infrastructure {
        pub mod ffmpeg_camera;
    }
}

pub mod render {
    pub mod domain {
        pub mod overlay;
        pub mod render_surface;
    }
    pub mod infrastructure {
        pub mod image_surface;
        pub mod snapshot_writer;
    }
}

pub mod enrollment {
    pub mod domain {
        pub mod enrollment_source;
    }
    pub mod infrastructure {
        pub mod location_enrollment_source;
    }
}

pub mod pipeline {
    pub mod detection_loop;
    pub mod frame_scheduler;
    pub mod model_loader;
    pub mod pipeline_logger;
    pub mod session;
    pub mod webcam_controller;
}
