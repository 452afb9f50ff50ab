mod link_preview;

pub use link_preview::{
    Metadata, OgMedia, OpenGraphData, PreviewPayload, PreviewResponseDto, PreviewResult,
    ERROR_SENTINEL,
};
