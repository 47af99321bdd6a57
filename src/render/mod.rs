pub mod bars;
pub mod canvas;
pub mod dots;
pub mod frame;
