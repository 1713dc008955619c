mod test_candidate_buffering;
mod test_glare_converges;
