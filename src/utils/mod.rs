pub mod face_cache;
