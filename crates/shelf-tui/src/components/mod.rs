pub mod track_list;
