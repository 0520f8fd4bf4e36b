pub mod candles;
pub mod sink;

pub use candles::{load_csv, CsvCandleProvider, ReplayCandleProvider};
pub use sink::PaperSink;
