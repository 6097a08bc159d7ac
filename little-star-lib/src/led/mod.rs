pub mod led_color;
