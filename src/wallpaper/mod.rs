pub mod wallpaper_engine;
