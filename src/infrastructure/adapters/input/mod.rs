pub mod html_timeline;
