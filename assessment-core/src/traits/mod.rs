pub mod assessment_delegate;
pub mod audio_device;
pub mod result_scorer;
