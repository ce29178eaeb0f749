mod common;
mod fetcher_tests;
mod hn_tests;
mod summarizer_tests;
