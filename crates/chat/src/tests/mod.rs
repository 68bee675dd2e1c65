mod media_tests;
mod storage_tests;
