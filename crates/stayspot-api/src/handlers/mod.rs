pub mod files;
pub mod health;
pub mod owner_images;
