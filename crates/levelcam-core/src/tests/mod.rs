mod export;
mod fakes;
