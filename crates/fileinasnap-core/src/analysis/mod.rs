pub mod exact;
pub mod similar;
