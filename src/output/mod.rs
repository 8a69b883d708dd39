// Output formatting: terminal display of inspections and flag summaries.

pub mod terminal;
