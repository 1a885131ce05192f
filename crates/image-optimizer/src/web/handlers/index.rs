//! Index page handler

/// Plain-text usage banner.
pub async fn index() -> &'static str {
    "Image Optimization Server - Use /api/image/w_400,q_90/image-url?origin=domain.com"
}
