pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod detection_result;
    pub mod frame;
    pub mod image;
}

pub mod imaging;

pub mod capture {
    pub mod domain {
        pub mod capture_driver;
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod detector_params;
        pub mod face_locator;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod capture_session;
    pub mod frame_processor;
    pub mod infrastructure;
    pub mod pipeline_logger;
    pub mod render_sink;
}

pub mod snapshot {
    pub mod domain {
        pub mod snapshot_writer;
    }
    pub mod infrastructure;
}
